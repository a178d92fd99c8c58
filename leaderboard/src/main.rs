mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use leaderboard_api::http::SessionSettings;
use leaderboard_core::{
    bootstrap::{init_database, init_services, load_config},
    logging,
    models::MemberId,
    service::JwtService,
};
use leaderboard_hub::BroadcastHub;

use server::LeaderboardServer;

#[derive(Parser, Debug)]
#[command(name = "leaderboard")]
#[command(version)]
#[command(about = "Real-time game leaderboard server")]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, short, env = "LEADERBOARD_CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP and WebSocket server (default)
    Serve,

    /// Print a bearer token for a member, signed with the configured secret
    Token {
        #[arg(long)]
        member: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = load_config(cli.config.as_deref())?;

    // 1.5. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    if let Some(Commands::Token { member }) = cli.command {
        let jwt = JwtService::new(&config.jwt)?;
        println!("{}", jwt.sign_token(&MemberId::from_string(member))?);
        return Ok(());
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Leaderboard server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Initialize database (history log is optional)
    let pool = if config.history_enabled() {
        Some(init_database(&config).await?)
    } else {
        info!("Database not configured, score history disabled");
        None
    };

    // 4. Start the broadcast hub
    let (hub, hub_task) = BroadcastHub::start();

    // 5. Initialize services
    let services = init_services(&config, pool.clone(), Arc::new(hub.clone())).await?;

    // 6. Build and run the server
    let settings = SessionSettings::from_config(&config);
    let server = LeaderboardServer::new(config, services, hub, hub_task, pool, settings);
    server.start().await
}
