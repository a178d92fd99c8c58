//! Bridge between one client transport and the hub
//!
//! A session registers a private bounded queue with the hub, then runs two
//! halves side by side: a writer draining the queue onto the transport in
//! order, and a liveness reader that only watches for the transport closing.
//! Whichever half finishes first ends the session and unregisters it.

use std::fmt::Display;

use futures::{Sink, SinkExt, Stream, StreamExt};
use leaderboard_core::models::ChannelId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::hub::{BroadcastHub, OutboundReceiver, SessionId};

pub struct ConnectionSession {
    id: SessionId,
    channel: ChannelId,
    hub: BroadcastHub,
    outbound: OutboundReceiver,
}

impl std::fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl ConnectionSession {
    /// Create the session's queue and register it under `channel`
    #[must_use]
    pub fn open(hub: BroadcastHub, channel: ChannelId, queue_capacity: usize) -> Self {
        let (sender, outbound) = mpsc::channel(queue_capacity.max(1));
        let id = nanoid::nanoid!();
        hub.register(id.clone(), channel.clone(), sender);

        Self {
            id,
            channel,
            hub,
            outbound,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Drive the session until the client goes away or the hub drops it.
    ///
    /// `sink` receives one JSON text frame per envelope. `inbound` is read
    /// only to notice disconnects; its items are discarded.
    pub async fn run<S, R, M, E>(self, sink: S, mut inbound: R)
    where
        S: Sink<String> + Unpin + Send + 'static,
        S::Error: Display,
        R: Stream<Item = Result<M, E>> + Unpin + Send,
        M: Send,
        E: Display + Send,
    {
        let Self {
            id,
            channel,
            hub,
            outbound,
        } = self;

        debug!(session_id = %id, channel = %channel, "Session started");
        let mut writer = tokio::spawn(write_outbound(id.clone(), outbound, sink));

        let writer_done = tokio::select! {
            () = watch_liveness(&id, &mut inbound) => false,
            _ = &mut writer => true,
        };

        hub.unregister(&id);

        // Unregistering closes the queue, which lets the writer finish
        if !writer_done {
            if let Err(e) = writer.await {
                warn!(session_id = %id, error = %e, "Session writer task failed");
            }
        }

        debug!(session_id = %id, channel = %channel, "Session ended");
    }
}

async fn watch_liveness<R, M, E>(session_id: &str, inbound: &mut R)
where
    R: Stream<Item = Result<M, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = inbound.next().await {
        if let Err(e) = frame {
            debug!(session_id = %session_id, error = %e, "Transport read failed");
            return;
        }
    }
    debug!(session_id = %session_id, "Transport closed by peer");
}

async fn write_outbound<S>(session_id: SessionId, mut outbound: OutboundReceiver, mut sink: S)
where
    S: Sink<String> + Unpin,
    S::Error: Display,
{
    while let Some(envelope) = outbound.recv().await {
        let frame = match serde_json::to_string(&*envelope) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to serialize envelope");
                continue;
            }
        };

        if let Err(e) = sink.send(frame).await {
            debug!(session_id = %session_id, error = %e, "Transport write failed");
            break;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(session_id = %session_id, error = %e, "Transport close failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::BroadcastEnvelope, hub::DEFAULT_QUEUE_CAPACITY};
    use futures::channel::mpsc as fmpsc;
    use leaderboard_core::models::{MemberId, RankSnapshot};
    use std::time::Duration;

    type Inbound = fmpsc::UnboundedSender<Result<String, std::io::Error>>;
    type Outbound = fmpsc::UnboundedReceiver<String>;

    /// Open a session on a fake transport and drive it in the background
    fn connect(
        hub: &BroadcastHub,
        channel: &str,
    ) -> (Inbound, Outbound, tokio::task::JoinHandle<()>) {
        let (out_tx, out_rx) = fmpsc::unbounded::<String>();
        let (in_tx, in_rx) = fmpsc::unbounded::<Result<String, std::io::Error>>();

        let session = ConnectionSession::open(
            hub.clone(),
            ChannelId::from(channel),
            DEFAULT_QUEUE_CAPACITY,
        );
        let task = tokio::spawn(session.run(out_tx, in_rx));
        (in_tx, out_rx, task)
    }

    fn game1_update() -> BroadcastEnvelope {
        BroadcastEnvelope::leaderboard_update(
            ChannelId::from("game1"),
            RankSnapshot::from_ordered(vec![
                (MemberId::from("bob"), 150),
                (MemberId::from("alice"), 100),
            ]),
        )
    }

    #[tokio::test]
    async fn test_subscribers_receive_channel_updates_only() {
        let (hub, _task) = BroadcastHub::start();
        let (_in1, mut out1, _) = connect(&hub, "game1");
        let (_in2, mut out2, _) = connect(&hub, "game1");
        let (_in3, mut out3, _) = connect(&hub, "game2");

        assert_eq!(hub.stats().await.unwrap().sessions, 3);
        hub.publish(game1_update());

        let expected = serde_json::json!({
            "type": "leaderboard_update",
            "game_id": "game1",
            "leaderboard": [
                {"username": "bob", "score": 150, "rank": 1},
                {"username": "alice", "score": 100, "rank": 2}
            ]
        });
        for out in [&mut out1, &mut out2] {
            let frame = out.next().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(value, expected);
        }

        let nothing = tokio::time::timeout(Duration::from_millis(50), out3.next()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_frames_keep_publish_order() {
        let (hub, _task) = BroadcastHub::start();
        let (_in, mut out, _) = connect(&hub, "game1");
        assert_eq!(hub.stats().await.unwrap().sessions, 1);

        for score in 0..20 {
            hub.publish(BroadcastEnvelope::leaderboard_update(
                ChannelId::from("game1"),
                RankSnapshot::from_ordered(vec![(MemberId::from("alice"), score)]),
            ));
        }

        for expected in 0..20 {
            let frame = out.next().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(value["leaderboard"][0]["score"], expected);
        }
    }

    #[tokio::test]
    async fn test_peer_close_unregisters_session() {
        let (hub, _task) = BroadcastHub::start();
        let (inbound, mut out, task) = connect(&hub, "game1");
        assert_eq!(hub.stats().await.unwrap().sessions, 1);

        drop(inbound);
        task.await.unwrap();

        assert_eq!(hub.stats().await.unwrap().sessions, 0);
        // Writer closed the transport on its way out
        assert!(out.next().await.is_none());
    }

    #[tokio::test]
    async fn test_read_error_unregisters_session() {
        let (hub, _task) = BroadcastHub::start();
        let (inbound, _out, task) = connect(&hub, "game1");

        inbound
            .unbounded_send(Ok("ignored application data".to_string()))
            .unwrap();
        inbound
            .unbounded_send(Err(std::io::Error::other("connection reset")))
            .unwrap();
        task.await.unwrap();

        assert_eq!(hub.subscriber_count(&ChannelId::from("game1")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_ends_session() {
        let (hub, _task) = BroadcastHub::start();
        let (_inbound, out, task) = connect(&hub, "game1");
        assert_eq!(hub.stats().await.unwrap().sessions, 1);

        drop(out);
        hub.publish(game1_update());
        task.await.unwrap();

        assert_eq!(hub.stats().await.unwrap().sessions, 0);
    }
}
