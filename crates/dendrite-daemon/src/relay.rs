//! Data relay: channel-identified pub/sub fan-out.
//!
//! Any party may publish a payload to a channel id; every connection
//! that joined that channel receives it. Delivery is fire-and-forget:
//! no buffering, no replay, and a publish to a channel with no
//! subscribers is silently dropped. Callers must join before data is
//! expected to arrive.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;
use tracing::warn;

use dendrite_common::rwlock_read_or_recover;
use dendrite_common::rwlock_write_or_recover;
use dendrite_ipc::Event;

use crate::connections::ConnectionId;

/// Write half of a connection, shared between RPC responses and relayed
/// events.
pub trait EventSink: Send + Sync {
    fn send(&self, event: &Event) -> std::io::Result<()>;
}

#[derive(Default)]
pub struct DataRelay {
    /// channel id -> subscribed connections
    subscribers: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    /// connection -> its outbound sink
    sinks: RwLock<HashMap<ConnectionId, Arc<dyn EventSink>>>,
}

impl DataRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a connection reachable for deliveries.
    pub fn attach(&self, conn: ConnectionId, sink: Arc<dyn EventSink>) {
        rwlock_write_or_recover(&self.sinks).insert(conn, sink);
    }

    /// Forget a connection's sink. Subscriptions are cleared separately
    /// by `leave_all`.
    pub fn detach(&self, conn: ConnectionId) {
        rwlock_write_or_recover(&self.sinks).remove(&conn);
    }

    /// Subscribe a connection to a channel. Idempotent.
    pub fn join(&self, conn: ConnectionId, channel: &str) {
        let mut subscribers = rwlock_write_or_recover(&self.subscribers);
        subscribers
            .entry(channel.to_string())
            .or_default()
            .insert(conn);
        debug!(conn, channel, "joined channel");
    }

    /// Deliver `payload` to every subscriber of `channel` as observed at
    /// call time. Returns the number of successful deliveries; zero
    /// subscribers is not an error.
    pub fn publish(&self, channel: &str, payload: Value) -> usize {
        let targets: Vec<ConnectionId> = {
            let subscribers = rwlock_read_or_recover(&self.subscribers);
            match subscribers.get(channel) {
                Some(set) => set.iter().copied().collect(),
                None => Vec::new(),
            }
        };

        if targets.is_empty() {
            debug!(channel, "publish with no subscribers, dropped");
            return 0;
        }

        let event = Event::SimulationData {
            data_channel_id: channel.to_string(),
            payload,
        };

        let mut delivered = 0;
        for conn in targets {
            let sink = {
                let sinks = rwlock_read_or_recover(&self.sinks);
                sinks.get(&conn).cloned()
            };
            match sink {
                Some(sink) => match sink.send(&event) {
                    Ok(()) => delivered += 1,
                    // A dying connection is cleaned up by its own
                    // handler; the publisher never sees the failure.
                    Err(e) => warn!(conn, channel, error = %e, "event delivery failed"),
                },
                None => debug!(conn, channel, "subscriber has no sink, skipped"),
            }
        }
        delivered
    }

    /// Remove a connection from every channel. Invoked on disconnect.
    pub fn leave_all(&self, conn: ConnectionId) {
        let mut subscribers = rwlock_write_or_recover(&self.subscribers);
        for set in subscribers.values_mut() {
            set.remove(&conn);
        }
        // Channel ids are never reused, so empty sets are dead weight.
        subscribers.retain(|_, set| !set.is_empty());
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        rwlock_read_or_recover(&self.subscribers)
            .get(channel)
            .map(|set| set.len())
            .unwrap_or(0)
    }
}
