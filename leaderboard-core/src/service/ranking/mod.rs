//! Ranked score storage
//!
//! Every channel owns one ranking table mapping member to score. A later
//! submission replaces the member's previous score. Ordering is descending
//! by score, ties broken by ascending member identity, so every query sees
//! a stable total order.

pub mod memory;
pub mod redis_store;

pub use memory::InMemoryScoreStore;
pub use redis_store::RedisScoreStore;

use async_trait::async_trait;

use crate::{
    models::{ChannelId, MemberId, MemberStanding, RankSnapshot},
    Result,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RankedScoreStore: Send + Sync {
    /// Insert or overwrite the member's score in the channel. All-or-nothing.
    async fn upsert(&self, channel: &ChannelId, member: &MemberId, score: i64) -> Result<()>;

    /// Best `limit` entries of the channel, ranked from 1
    async fn top(&self, channel: &ChannelId, limit: usize) -> Result<RankSnapshot>;

    /// Rank and score of a single member, `None` if the member has no entry
    async fn standing(&self, channel: &ChannelId, member: &MemberId)
        -> Result<Option<MemberStanding>>;

    /// Number of members ranked in the channel
    async fn member_count(&self, channel: &ChannelId) -> Result<u64>;

    /// Channels the member has submitted to, sorted ascending
    async fn channels_of(&self, member: &MemberId) -> Result<Vec<ChannelId>>;
}
