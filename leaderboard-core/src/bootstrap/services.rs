//! Service initialization and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    repository::ScoreHistoryRepository,
    service::{
        InMemoryScoreStore, JwtService, JwtValidator, LeaderboardPublisher, RankedScoreStore,
        RedisScoreStore, ScoreHistory, SubmissionCoordinator,
    },
    Config,
};

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    pub coordinator: Arc<SubmissionCoordinator>,
    pub jwt_validator: Arc<JwtValidator>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

/// Build the ranked store, the history sink, and the submission coordinator.
///
/// `pool` is `None` when the history log is disabled.
pub async fn init_services(
    config: &Config,
    pool: Option<PgPool>,
    publisher: Arc<dyn LeaderboardPublisher>,
) -> anyhow::Result<Services> {
    info!("Initializing services...");

    let jwt_service = Arc::new(JwtService::new(&config.jwt)?);
    let jwt_validator = Arc::new(JwtValidator::new(jwt_service));

    let store: Arc<dyn RankedScoreStore> = if config.redis_enabled() {
        let client = redis::Client::open(config.redis.url.clone())?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        info!(key_prefix = %config.redis.key_prefix, "Using Redis ranked score store");
        Arc::new(RedisScoreStore::new(conn, config.redis.key_prefix.clone()))
    } else {
        info!("Redis not configured, using in-memory ranked score store");
        Arc::new(InMemoryScoreStore::new())
    };

    let history = pool.map(|pool| {
        info!("Score history log enabled");
        Arc::new(ScoreHistoryRepository::new(pool)) as Arc<dyn ScoreHistory>
    });

    let coordinator = Arc::new(SubmissionCoordinator::new(
        store,
        history,
        publisher,
        config.leaderboard.top_n,
    ));

    info!("Services initialized");
    Ok(Services {
        coordinator,
        jwt_validator,
    })
}
