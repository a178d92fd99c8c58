use sqlx::PgPool;

use crate::{models::ScoreRecord, Result};

/// Append-only log of every accepted submission
#[derive(Clone, Debug)]
pub struct ScoreHistoryRepository {
    pool: PgPool,
}

impl ScoreHistoryRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, record: &ScoreRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO score_history (username, game_id, score, submitted_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.username.as_str())
        .bind(record.channel.as_str())
        .bind(record.score)
        .bind(record.submitted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
