//! Subscriber registry and fan-out actor
//!
//! A single task owns the channel → session registry. Every register,
//! unregister and publish request goes through its command queue, so the
//! registry is never shared and never locked. Publishing only ever does a
//! non-blocking enqueue per subscriber; a subscriber whose queue is full or
//! closed is dropped from the registry on the spot.

use std::collections::HashMap;
use std::sync::Arc;

use leaderboard_core::models::{ChannelId, RankSnapshot};
use leaderboard_core::service::LeaderboardPublisher;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{events::BroadcastEnvelope, Error, Result};

/// Outbound queue depth of a session before it counts as a slow consumer
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Identity of one registered session
pub type SessionId = String;

/// Hub side of a session's outbound queue
pub type OutboundSender = mpsc::Sender<Arc<BroadcastEnvelope>>;

/// Session side of its outbound queue
pub type OutboundReceiver = mpsc::Receiver<Arc<BroadcastEnvelope>>;

/// Registry counters, as seen by the actor at the time of the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Channels that ever had a subscriber
    pub channels: usize,
    /// Currently registered sessions
    pub sessions: usize,
}

enum HubCommand {
    Register {
        session_id: SessionId,
        channel: ChannelId,
        sender: OutboundSender,
    },
    Unregister {
        session_id: SessionId,
    },
    Publish {
        envelope: Arc<BroadcastEnvelope>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    SubscriberCount {
        channel: ChannelId,
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Cloneable handle to the hub actor.
///
/// The actor stops on `shutdown` or once every handle is dropped.
#[derive(Clone)]
pub struct BroadcastHub {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("running", &!self.commands.is_closed())
            .finish()
    }
}

impl BroadcastHub {
    /// Spawn the hub actor on the current runtime
    #[must_use]
    pub fn start() -> (Self, JoinHandle<()>) {
        let (commands, inbox) = mpsc::unbounded_channel();
        let task = tokio::spawn(HubActor::default().run(inbox));
        (Self { commands }, task)
    }

    /// Add a session to its channel's subscriber set.
    ///
    /// Registering an already known session replaces its queue and channel.
    pub fn register(&self, session_id: SessionId, channel: ChannelId, sender: OutboundSender) {
        self.send(HubCommand::Register {
            session_id,
            channel,
            sender,
        });
    }

    /// Remove a session and close its outbound queue. Unknown ids are ignored.
    pub fn unregister(&self, session_id: &str) {
        self.send(HubCommand::Unregister {
            session_id: session_id.to_string(),
        });
    }

    /// Deliver `envelope` to every session on its channel
    pub fn publish(&self, envelope: BroadcastEnvelope) {
        self.send(HubCommand::Publish {
            envelope: Arc::new(envelope),
        });
    }

    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply });
        rx.await.map_err(|_| Error::HubClosed)
    }

    pub async fn subscriber_count(&self, channel: &ChannelId) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::SubscriberCount {
            channel: channel.clone(),
            reply,
        });
        rx.await.map_err(|_| Error::HubClosed)
    }

    /// Stop the actor. Every registered session sees its queue close.
    pub fn shutdown(&self) {
        self.send(HubCommand::Shutdown);
    }

    fn send(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            debug!("Broadcast hub stopped, dropping command");
        }
    }
}

impl LeaderboardPublisher for BroadcastHub {
    fn publish_leaderboard(&self, channel: &ChannelId, snapshot: RankSnapshot) {
        self.publish(BroadcastEnvelope::leaderboard_update(channel.clone(), snapshot));
    }
}

#[derive(Default)]
struct HubActor {
    /// channel -> (session -> outbound queue)
    channels: HashMap<ChannelId, HashMap<SessionId, OutboundSender>>,
    /// session -> channel, for unregister
    sessions: HashMap<SessionId, ChannelId>,
}

impl HubActor {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<HubCommand>) {
        info!("Broadcast hub started");

        while let Some(command) = inbox.recv().await {
            match command {
                HubCommand::Register {
                    session_id,
                    channel,
                    sender,
                } => self.register(session_id, channel, sender),
                HubCommand::Unregister { session_id } => self.unregister(&session_id),
                HubCommand::Publish { envelope } => self.publish(&envelope),
                HubCommand::Stats { reply } => {
                    let _ = reply.send(HubStats {
                        channels: self.channels.len(),
                        sessions: self.sessions.len(),
                    });
                }
                HubCommand::SubscriberCount { channel, reply } => {
                    let count = self.channels.get(&channel).map_or(0, HashMap::len);
                    let _ = reply.send(count);
                }
                HubCommand::Shutdown => break,
            }
        }

        info!(
            sessions = self.sessions.len(),
            "Broadcast hub stopped, closing remaining sessions"
        );
    }

    fn register(&mut self, session_id: SessionId, channel: ChannelId, sender: OutboundSender) {
        if let Some(previous) = self.sessions.insert(session_id.clone(), channel.clone()) {
            if let Some(subscribers) = self.channels.get_mut(&previous) {
                subscribers.remove(&session_id);
            }
        }

        let subscribers = self.channels.entry(channel.clone()).or_default();
        subscribers.insert(session_id.clone(), sender);

        debug!(
            session_id = %session_id,
            channel = %channel,
            subscribers = subscribers.len(),
            "Session registered"
        );
    }

    fn unregister(&mut self, session_id: &str) {
        let Some(channel) = self.sessions.remove(session_id) else {
            debug!(session_id = %session_id, "Unregister for unknown session ignored");
            return;
        };

        // Dropping the sender closes the session's queue
        if let Some(subscribers) = self.channels.get_mut(&channel) {
            subscribers.remove(session_id);
        }

        debug!(session_id = %session_id, channel = %channel, "Session unregistered");
    }

    fn publish(&mut self, envelope: &Arc<BroadcastEnvelope>) {
        let channel = envelope.channel();
        let Some(subscribers) = self.channels.get_mut(channel) else {
            return;
        };

        let mut evicted = Vec::new();
        for (session_id, sender) in subscribers.iter() {
            match sender.try_send(envelope.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        session_id = %session_id,
                        channel = %channel,
                        "Outbound queue full, evicting slow session"
                    );
                    evicted.push(session_id.clone());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(session_id = %session_id, channel = %channel, "Session queue closed");
                    evicted.push(session_id.clone());
                }
            }
        }

        for session_id in &evicted {
            subscribers.remove(session_id);
        }
        for session_id in &evicted {
            self.sessions.remove(session_id);
        }

        debug!(
            channel = %channel,
            event_type = envelope.event_type(),
            delivered = subscribers.len(),
            evicted = evicted.len(),
            "Envelope published"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_core::models::MemberId;

    fn update(channel: &str, score: i64) -> BroadcastEnvelope {
        BroadcastEnvelope::leaderboard_update(
            ChannelId::from(channel),
            RankSnapshot::from_ordered(vec![(MemberId::from("alice"), score)]),
        )
    }

    fn score_of(envelope: &BroadcastEnvelope) -> i64 {
        match envelope {
            BroadcastEnvelope::LeaderboardUpdate { leaderboard, .. } => {
                leaderboard.entries()[0].score
            }
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_only_its_channel() {
        let (hub, _task) = BroadcastHub::start();
        let (tx1, mut rx1) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let (tx2, mut rx2) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);

        hub.register("s1".into(), ChannelId::from("game1"), tx1);
        hub.register("s2".into(), ChannelId::from("game2"), tx2);
        hub.publish(update("game1", 100));

        let received = rx1.recv().await.unwrap();
        assert_eq!(score_of(&received), 100);

        // Stats is answered after the publish, so game2 had its chance
        assert_eq!(hub.stats().await.unwrap().sessions, 2);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let (hub, _task) = BroadcastHub::start();
        let (tx, _rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let game1 = ChannelId::from("game1");

        hub.register("s1".into(), game1.clone(), tx.clone());
        hub.register("s1".into(), game1.clone(), tx);

        assert_eq!(hub.subscriber_count(&game1).await.unwrap(), 1);
        assert_eq!(hub.stats().await.unwrap().sessions, 1);
    }

    #[tokio::test]
    async fn test_unregister_twice_and_unknown_is_noop() {
        let (hub, _task) = BroadcastHub::start();
        let (tx, mut rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let game1 = ChannelId::from("game1");

        hub.register("s1".into(), game1.clone(), tx);
        hub.unregister("s1");
        hub.unregister("s1");
        hub.unregister("never-registered");

        // Queue is closed once the hub drops its sender
        assert!(rx.recv().await.is_none());

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats, HubStats { channels: 1, sessions: 0 });
        assert_eq!(hub.subscriber_count(&game1).await.unwrap(), 0);

        // Hub still serves publishes afterwards
        let (tx2, mut rx2) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        hub.register("s2".into(), game1, tx2);
        hub.publish(update("game1", 7));
        assert_eq!(score_of(&rx2.recv().await.unwrap()), 7);
    }

    #[tokio::test]
    async fn test_slow_consumer_evicted_without_blocking_others() {
        let (hub, _task) = BroadcastHub::start();
        let game1 = ChannelId::from("game1");
        let (slow_tx, mut slow_rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let (fast_tx, mut fast_rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);

        hub.register("slow".into(), game1.clone(), slow_tx);
        hub.register("fast".into(), game1.clone(), fast_tx);

        let first_batch = 200;
        let total = 300;

        for score in 0..first_batch {
            hub.publish(update("game1", score));
        }
        for expected in 0..first_batch {
            assert_eq!(score_of(&fast_rx.recv().await.unwrap()), expected);
        }

        for score in first_batch..total {
            hub.publish(update("game1", score));
        }
        for expected in first_batch..total {
            assert_eq!(score_of(&fast_rx.recv().await.unwrap()), expected);
        }

        assert_eq!(hub.subscriber_count(&game1).await.unwrap(), 1);

        // The slow session got a full queue and then saw it closed
        let mut buffered = 0;
        while let Some(envelope) = slow_rx.recv().await {
            assert_eq!(score_of(&envelope), buffered);
            buffered += 1;
        }
        assert_eq!(buffered, DEFAULT_QUEUE_CAPACITY as i64);
    }

    #[tokio::test]
    async fn test_closed_queue_is_pruned_on_publish() {
        let (hub, _task) = BroadcastHub::start();
        let (tx, rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let game1 = ChannelId::from("game1");

        hub.register("gone".into(), game1.clone(), tx);
        drop(rx);
        hub.publish(update("game1", 1));

        assert_eq!(hub.subscriber_count(&game1).await.unwrap(), 0);
        assert_eq!(hub.stats().await.unwrap().sessions, 0);
    }

    #[tokio::test]
    async fn test_publisher_trait_wraps_snapshot() {
        let (hub, _task) = BroadcastHub::start();
        let (tx, mut rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let game1 = ChannelId::from("game1");
        let snapshot = RankSnapshot::from_ordered(vec![(MemberId::from("bob"), 150)]);

        hub.register("s1".into(), game1.clone(), tx);
        hub.publish_leaderboard(&game1, snapshot.clone());

        let envelope = rx.recv().await.unwrap();
        assert_eq!(*envelope, BroadcastEnvelope::leaderboard_update(game1, snapshot));
    }

    #[tokio::test]
    async fn test_shutdown_closes_every_queue() {
        let (hub, task) = BroadcastHub::start();
        let (tx1, mut rx1) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let (tx2, mut rx2) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);

        hub.register("s1".into(), ChannelId::from("game1"), tx1);
        hub.register("s2".into(), ChannelId::from("game2"), tx2);
        hub.shutdown();
        task.await.unwrap();

        assert!(rx1.recv().await.is_none());
        assert!(rx2.recv().await.is_none());
        assert!(matches!(hub.stats().await, Err(Error::HubClosed)));
    }

    #[tokio::test]
    async fn test_stats_fail_once_actor_stopped() {
        let (hub, task) = BroadcastHub::start();
        task.abort();
        let _ = task.await;

        assert!(matches!(hub.stats().await, Err(Error::HubClosed)));
    }
}
