use leaderboard_core::models::{ChannelId, RankSnapshot};
use serde::{Deserialize, Serialize};

/// Messages fanned out to every session subscribed to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEnvelope {
    /// Full top-N snapshot of a channel after a score changed
    LeaderboardUpdate {
        game_id: ChannelId,
        leaderboard: RankSnapshot,
    },
}

impl BroadcastEnvelope {
    #[must_use]
    pub const fn leaderboard_update(game_id: ChannelId, leaderboard: RankSnapshot) -> Self {
        Self::LeaderboardUpdate {
            game_id,
            leaderboard,
        }
    }

    /// Channel whose subscribers receive this envelope
    #[must_use]
    pub const fn channel(&self) -> &ChannelId {
        match self {
            Self::LeaderboardUpdate { game_id, .. } => game_id,
        }
    }

    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::LeaderboardUpdate { .. } => "leaderboard_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_core::models::MemberId;

    #[test]
    fn test_leaderboard_update_wire_format() {
        let envelope = BroadcastEnvelope::leaderboard_update(
            ChannelId::from("game1"),
            RankSnapshot::from_ordered(vec![
                (MemberId::from("bob"), 150),
                (MemberId::from("alice"), 100),
            ]),
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "leaderboard_update",
                "game_id": "game1",
                "leaderboard": [
                    {"username": "bob", "score": 150, "rank": 1},
                    {"username": "alice", "score": 100, "rank": 2}
                ]
            })
        );
        assert_eq!(envelope.event_type(), "leaderboard_update");
        assert_eq!(envelope.channel().as_str(), "game1");
    }
}
