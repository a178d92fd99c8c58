use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, MemberId};

/// Largest accepted score. Every integer up to 2^53 survives a round trip
/// through a sorted-set score.
pub const MAX_SCORE: i64 = 1 << 53;

/// One row of a ranking snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub username: MemberId,
    pub score: i64,
    /// 1-based position
    pub rank: u64,
}

/// Ordered top-N view of a channel, best first.
///
/// Serializes as a bare JSON array of `{username, score, rank}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankSnapshot(Vec<RankedEntry>);

impl RankSnapshot {
    /// Build a snapshot from `(member, score)` pairs that are already sorted
    /// by descending score with ties broken by ascending member.
    #[must_use]
    pub fn from_ordered<I>(ordered: I) -> Self
    where
        I: IntoIterator<Item = (MemberId, i64)>,
    {
        Self(
            ordered
                .into_iter()
                .zip(1u64..)
                .map(|((username, score), rank)| RankedEntry {
                    username,
                    score,
                    rank,
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn entries(&self) -> &[RankedEntry] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<RankedEntry> {
        self.0
    }
}

/// A member's current position within one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStanding {
    pub rank: u64,
    pub score: i64,
}

/// Rank query answer for one member, including the channel's population
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRank {
    pub username: MemberId,
    pub rank: u64,
    pub score: i64,
    pub total_players: u64,
}

/// Append-only history row, written after every accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub username: MemberId,
    pub channel: ChannelId,
    pub score: i64,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_assigns_one_based_ranks() {
        let snapshot = RankSnapshot::from_ordered(vec![
            (MemberId::from("bob"), 150),
            (MemberId::from("alice"), 100),
        ]);

        let ranks: Vec<u64> = snapshot.entries().iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(snapshot.entries()[0].username.as_str(), "bob");
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = RankSnapshot::from_ordered(vec![(MemberId::from("alice"), 100)]);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{"username": "alice", "score": 100, "rank": 1}])
        );
    }
}
