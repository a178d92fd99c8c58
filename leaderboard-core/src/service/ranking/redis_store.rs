use async_trait::async_trait;
use redis::aio::ConnectionManager as RedisConnectionManager;
use redis::AsyncCommands;

use super::RankedScoreStore;
use crate::{
    models::{ChannelId, MemberId, MemberStanding, RankSnapshot},
    Result,
};

/// Sorted-set backed ranked score store.
///
/// Scores are stored negated, so ascending sorted-set order (with Redis's
/// lexicographic tie-break on the member) yields descending score and
/// ascending member name. Every read negates the stored value back.
#[derive(Clone)]
pub struct RedisScoreStore {
    redis: RedisConnectionManager,
    key_prefix: String,
}

impl RedisScoreStore {
    #[must_use]
    pub const fn new(redis: RedisConnectionManager, key_prefix: String) -> Self {
        Self { redis, key_prefix }
    }

    fn ranking_key(&self, channel: &ChannelId) -> String {
        format!("{}{}", self.key_prefix, channel)
    }

    fn membership_key(&self, member: &MemberId) -> String {
        format!("{}member:{}:channels", self.key_prefix, member)
    }
}

impl std::fmt::Debug for RedisScoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisScoreStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

/// Rank and score read from one snapshot of the sorted set
fn standing_pipeline(key: &str, member: &MemberId) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .zrank(key, member.as_str())
        .zscore(key, member.as_str());
    pipe
}

/// Exact for every score up to `MAX_SCORE`
fn to_stored(score: i64) -> f64 {
    -(score as f64)
}

fn from_stored(stored: f64) -> i64 {
    (-stored) as i64
}

#[async_trait]
impl RankedScoreStore for RedisScoreStore {
    async fn upsert(&self, channel: &ChannelId, member: &MemberId, score: i64) -> Result<()> {
        let mut conn = self.redis.clone();

        // Ranking entry and membership index land together
        let mut pipe = redis::pipe();
        pipe.atomic()
            .zadd(self.ranking_key(channel), member.as_str(), to_stored(score))
            .ignore()
            .sadd(self.membership_key(member), channel.as_str())
            .ignore();
        pipe.query_async::<()>(&mut conn).await?;

        tracing::debug!(channel = %channel, member = %member, score, "Score upserted");
        Ok(())
    }

    async fn top(&self, channel: &ChannelId, limit: usize) -> Result<RankSnapshot> {
        if limit == 0 {
            return Ok(RankSnapshot::default());
        }

        let mut conn = self.redis.clone();
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);
        let entries: Vec<(String, f64)> = conn
            .zrange_withscores(self.ranking_key(channel), 0, stop)
            .await?;

        Ok(RankSnapshot::from_ordered(entries.into_iter().map(
            |(member, stored)| (MemberId::from_string(member), from_stored(stored)),
        )))
    }

    async fn standing(
        &self,
        channel: &ChannelId,
        member: &MemberId,
    ) -> Result<Option<MemberStanding>> {
        let mut conn = self.redis.clone();
        let key = self.ranking_key(channel);

        let (rank, stored): (Option<u64>, Option<f64>) = standing_pipeline(&key, member)
            .query_async(&mut conn)
            .await?;

        Ok(match (rank, stored) {
            (Some(rank), Some(stored)) => Some(MemberStanding {
                rank: rank + 1,
                score: from_stored(stored),
            }),
            _ => None,
        })
    }

    async fn member_count(&self, channel: &ChannelId) -> Result<u64> {
        let mut conn = self.redis.clone();
        let count: u64 = conn.zcard(self.ranking_key(channel)).await?;
        Ok(count)
    }

    async fn channels_of(&self, member: &MemberId) -> Result<Vec<ChannelId>> {
        let mut conn = self.redis.clone();
        let members: Vec<String> = conn.smembers(self.membership_key(member)).await?;

        let mut channels: Vec<ChannelId> =
            members.into_iter().map(ChannelId::from_string).collect();
        channels.sort();
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_score_is_negated() {
        assert_eq!(to_stored(150), -150.0);
        assert_eq!(from_stored(-150.0), 150);
        assert_eq!(from_stored(to_stored(0)), 0);
        assert!(to_stored(150) < to_stored(100));
    }

    #[test]
    fn test_max_score_survives_storage() {
        use crate::models::MAX_SCORE;

        assert_eq!(from_stored(to_stored(MAX_SCORE)), MAX_SCORE);
        assert_eq!(from_stored(to_stored(MAX_SCORE - 1)), MAX_SCORE - 1);
        assert!(to_stored(MAX_SCORE) < to_stored(MAX_SCORE - 1));
    }

    #[test]
    fn test_standing_reads_in_one_transaction() {
        let pipe = standing_pipeline("lb:game1", &MemberId::from("alice"));

        assert!(pipe.is_transaction());
        assert_eq!(pipe.len(), 2);
        let packed = String::from_utf8_lossy(&pipe.get_packed_pipeline()).into_owned();
        assert!(packed.contains("MULTI"));
        assert!(packed.contains("ZRANK"));
        assert!(packed.contains("ZSCORE"));
        assert!(packed.contains("EXEC"));
    }
}
