use std::time::Duration;

use leaderboard_api::{create_router, http::SessionSettings, AppState};
use leaderboard_core::{bootstrap::Services, Config};
use leaderboard_hub::BroadcastHub;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Owns the running components and tears them down in order
pub struct LeaderboardServer {
    config: Config,
    services: Services,
    hub: BroadcastHub,
    hub_task: JoinHandle<()>,
    pool: Option<PgPool>,
    settings: SessionSettings,
}

impl LeaderboardServer {
    pub const fn new(
        config: Config,
        services: Services,
        hub: BroadcastHub,
        hub_task: JoinHandle<()>,
        pool: Option<PgPool>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            config,
            services,
            hub,
            hub_task,
            pool,
            settings,
        }
    }

    /// Serve until a shutdown signal arrives or the HTTP server stops
    pub async fn start(self) -> anyhow::Result<()> {
        info!("Starting leaderboard server...");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let router = create_router(AppState {
            coordinator: self.services.coordinator.clone(),
            hub: self.hub.clone(),
            jwt_validator: self.services.jwt_validator.clone(),
            settings: self.settings,
        });

        let http_address = self.config.http_address();
        let listener = tokio::net::TcpListener::bind(&http_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_address}: {e}"))?;
        info!("HTTP server listening on {}", http_address);

        let mut http_handle = tokio::spawn(async move {
            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        let _ = shutdown_tx.send(true);
        if !http_handle.is_finished() {
            if tokio::time::timeout(Duration::from_secs(30), &mut http_handle)
                .await
                .is_err()
            {
                warn!("HTTP server did not drain within 30s, aborting");
                http_handle.abort();
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(self) {
        info!("Shutting down leaderboard server...");

        match self.hub.stats().await {
            Ok(stats) => info!(
                channels = stats.channels,
                sessions = stats.sessions,
                "Closing broadcast hub"
            ),
            Err(e) => warn!("Broadcast hub already stopped: {}", e),
        }

        // Closing the hub closes every session queue, ending open WebSockets
        self.hub.shutdown();
        if tokio::time::timeout(Duration::from_secs(5), self.hub_task)
            .await
            .is_err()
        {
            warn!("Broadcast hub did not stop within 5s");
        }

        if let Some(pool) = self.pool {
            info!("Closing database connection pool...");
            pool.close().await;
            info!("Database pool closed");
        }

        info!("Leaderboard server stopped");
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
