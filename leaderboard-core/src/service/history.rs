use async_trait::async_trait;

use crate::{models::ScoreRecord, repository::ScoreHistoryRepository, Result};

/// Sink for the append-only submission log.
///
/// Failures here are never fatal to a submission; callers log and move on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreHistory: Send + Sync {
    async fn append(&self, record: &ScoreRecord) -> Result<()>;
}

#[async_trait]
impl ScoreHistory for ScoreHistoryRepository {
    async fn append(&self, record: &ScoreRecord) -> Result<()> {
        self.insert(record).await
    }
}
