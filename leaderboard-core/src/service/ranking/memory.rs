use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::RankedScoreStore;
use crate::{
    models::{ChannelId, MemberId, MemberStanding, RankSnapshot},
    Result,
};

/// Sort key: descending score, then ascending member
type OrderKey = (Reverse<i64>, MemberId);

/// Ranking table of a single channel.
///
/// `order` stays sorted by `OrderKey`, so a member's rank is its index and
/// is found by binary search.
#[derive(Debug, Default)]
struct ChannelTable {
    scores: HashMap<MemberId, i64>,
    order: Vec<OrderKey>,
}

impl ChannelTable {
    fn upsert(&mut self, member: &MemberId, score: i64) {
        if let Some(previous) = self.scores.insert(member.clone(), score) {
            if previous == score {
                return;
            }
            if let Ok(index) = self.order.binary_search(&(Reverse(previous), member.clone())) {
                self.order.remove(index);
            }
        }
        let key = (Reverse(score), member.clone());
        let index = self.order.partition_point(|entry| *entry < key);
        self.order.insert(index, key);
    }

    fn top(&self, limit: usize) -> RankSnapshot {
        RankSnapshot::from_ordered(
            self.order
                .iter()
                .take(limit)
                .map(|(Reverse(score), member)| (member.clone(), *score)),
        )
    }

    fn standing(&self, member: &MemberId) -> Option<MemberStanding> {
        let score = *self.scores.get(member)?;
        let index = self
            .order
            .binary_search(&(Reverse(score), member.clone()))
            .ok()?;
        Some(MemberStanding {
            rank: index as u64 + 1,
            score,
        })
    }
}

/// In-process ranked score store.
///
/// Used when no Redis is configured and in tests. Rank lookups are
/// logarithmic; an upsert shifts the entries ranked below the member.
#[derive(Clone, Default)]
pub struct InMemoryScoreStore {
    tables: Arc<DashMap<ChannelId, ChannelTable>>,
    memberships: Arc<DashMap<MemberId, BTreeSet<ChannelId>>>,
}

impl InMemoryScoreStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of channels holding at least one score
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.tables.len()
    }
}

impl std::fmt::Debug for InMemoryScoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryScoreStore")
            .field("channels", &self.tables.len())
            .finish()
    }
}

#[async_trait]
impl RankedScoreStore for InMemoryScoreStore {
    async fn upsert(&self, channel: &ChannelId, member: &MemberId, score: i64) -> Result<()> {
        self.tables
            .entry(channel.clone())
            .or_default()
            .upsert(member, score);
        self.memberships
            .entry(member.clone())
            .or_default()
            .insert(channel.clone());
        Ok(())
    }

    async fn top(&self, channel: &ChannelId, limit: usize) -> Result<RankSnapshot> {
        Ok(self
            .tables
            .get(channel)
            .map(|table| table.top(limit))
            .unwrap_or_default())
    }

    async fn standing(
        &self,
        channel: &ChannelId,
        member: &MemberId,
    ) -> Result<Option<MemberStanding>> {
        Ok(self
            .tables
            .get(channel)
            .and_then(|table| table.standing(member)))
    }

    async fn member_count(&self, channel: &ChannelId) -> Result<u64> {
        Ok(self
            .tables
            .get(channel)
            .map_or(0, |table| table.scores.len() as u64))
    }

    async fn channels_of(&self, member: &MemberId) -> Result<Vec<ChannelId>> {
        Ok(self
            .memberships
            .get(member)
            .map(|channels| channels.iter().cloned().collect())
            .unwrap_or_default())
    }
}
