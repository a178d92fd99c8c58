//! Error types for the broadcast hub

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The hub actor has stopped and no longer answers requests
    #[error("Broadcast hub is not running")]
    HubClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
