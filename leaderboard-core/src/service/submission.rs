//! Score submission flow
//!
//! A submission is validated, upserted into the ranked store, logged to the
//! history sink in the background, and finally fanned out as a fresh top-N
//! snapshot of the channel. Only the upsert is allowed to fail the request.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{history::ScoreHistory, ranking::RankedScoreStore};
use crate::{
    models::{ChannelId, MemberId, MemberRank, RankSnapshot, ScoreRecord, MAX_SCORE},
    Error, Result,
};

/// Receiver of fresh channel snapshots.
///
/// Publishing must not block and cannot fail from the submitter's point of view.
#[cfg_attr(test, mockall::automock)]
pub trait LeaderboardPublisher: Send + Sync {
    fn publish_leaderboard(&self, channel: &ChannelId, snapshot: RankSnapshot);
}

/// What the submitter gets back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub channel: ChannelId,
    pub rank: u64,
    pub score: i64,
}

#[derive(Clone)]
pub struct SubmissionCoordinator {
    store: Arc<dyn RankedScoreStore>,
    history: Option<Arc<dyn ScoreHistory>>,
    publisher: Arc<dyn LeaderboardPublisher>,
    top_n: usize,
}

impl std::fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("history", &self.history.is_some())
            .field("top_n", &self.top_n)
            .finish_non_exhaustive()
    }
}

impl SubmissionCoordinator {
    #[must_use]
    pub fn new(
        store: Arc<dyn RankedScoreStore>,
        history: Option<Arc<dyn ScoreHistory>>,
        publisher: Arc<dyn LeaderboardPublisher>,
        top_n: usize,
    ) -> Self {
        Self {
            store,
            history,
            publisher,
            top_n,
        }
    }

    /// Record `score` for `member` and broadcast the channel's new standings.
    ///
    /// `channel` is the raw client value; absent or blank means the default channel.
    pub async fn submit(
        &self,
        member: &MemberId,
        channel: Option<String>,
        score: i64,
    ) -> Result<SubmissionOutcome> {
        if score < 0 {
            return Err(Error::InvalidInput("Score must be non-negative".to_string()));
        }
        if score > MAX_SCORE {
            return Err(Error::InvalidInput(format!("Score must not exceed {MAX_SCORE}")));
        }
        let channel = ChannelId::or_default(channel);

        self.store.upsert(&channel, member, score).await?;
        self.append_history(member, &channel, score);

        let standing = self
            .store
            .standing(&channel, member)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!("Score for {member} vanished from {channel} after upsert"))
            })?;
        let snapshot = self.store.top(&channel, self.top_n).await?;

        debug!(channel = %channel, entries = snapshot.len(), "Publishing leaderboard snapshot");
        self.publisher.publish_leaderboard(&channel, snapshot);

        info!(
            member = %member,
            channel = %channel,
            score,
            rank = standing.rank,
            "Score submitted"
        );

        Ok(SubmissionOutcome {
            channel,
            rank: standing.rank,
            score: standing.score,
        })
    }

    /// Current top-N of a channel
    pub async fn leaderboard(&self, channel: Option<String>) -> Result<(ChannelId, RankSnapshot)> {
        let channel = ChannelId::or_default(channel);
        let snapshot = self.store.top(&channel, self.top_n).await?;
        Ok((channel, snapshot))
    }

    /// Rank, score and channel population for one member
    pub async fn member_rank(
        &self,
        member: &MemberId,
        channel: Option<String>,
    ) -> Result<MemberRank> {
        let channel = ChannelId::or_default(channel);
        let standing = self
            .store
            .standing(&channel, member)
            .await?
            .ok_or_else(|| Error::NotFound("User not found in leaderboard".to_string()))?;
        let total_players = self.store.member_count(&channel).await?;

        Ok(MemberRank {
            username: member.clone(),
            rank: standing.rank,
            score: standing.score,
            total_players,
        })
    }

    /// Channels the member has ever submitted to
    pub async fn channels_of(&self, member: &MemberId) -> Result<Vec<ChannelId>> {
        self.store.channels_of(member).await
    }

    fn append_history(&self, member: &MemberId, channel: &ChannelId, score: i64) {
        let Some(history) = self.history.clone() else {
            return;
        };
        let record = ScoreRecord {
            username: member.clone(),
            channel: channel.clone(),
            score,
            submitted_at: Utc::now(),
        };

        tokio::spawn(async move {
            if let Err(e) = history.append(&record).await {
                warn!(
                    member = %record.username,
                    channel = %record.channel,
                    error = %e,
                    "Failed to append score history"
                );
            }
        });
    }
}
