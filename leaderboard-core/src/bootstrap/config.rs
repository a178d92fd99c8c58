//! Configuration loading

use anyhow::Result;
use std::path::Path;

use crate::Config;

/// Load configuration from a config file and environment variables
///
/// Config file search order:
/// 1. `explicit_path` (from the command line)
/// 2. `LEADERBOARD_CONFIG_PATH` environment variable
/// 3. ./config.yaml (current working directory)
/// 4. Fall back to environment variables only
///
/// Validation is left to the caller so that commands needing only part of
/// the configuration can still run.
pub fn load_config(explicit_path: Option<&str>) -> Result<Config> {
    let config_path = explicit_path
        .map(str::to_string)
        .or_else(|| std::env::var("LEADERBOARD_CONFIG_PATH").ok())
        .filter(|p| Path::new(p).exists())
        .or_else(|| {
            let cwd = "config.yaml";
            Path::new(cwd).exists().then(|| cwd.to_string())
        });

    let config = if let Some(path) = config_path {
        eprintln!("Loading config from {path}");
        Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {path}: {e}"))?
    } else {
        eprintln!("No config file found, using environment variables");
        Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?
    };

    Ok(config)
}
