pub mod error;
pub mod events;
pub mod hub;
pub mod session;

pub use error::{Error, Result};
pub use events::BroadcastEnvelope;
pub use hub::{
    BroadcastHub, HubStats, OutboundReceiver, OutboundSender, SessionId, DEFAULT_QUEUE_CAPACITY,
};
pub use session::ConnectionSession;
