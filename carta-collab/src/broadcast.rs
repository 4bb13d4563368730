//! Fan-out of encoded event frames to every connected client.
//!
//! All connections share one hub backed by a tokio broadcast channel: a
//! frame is encoded once and delivered to N subscribers without re-encoding.
//! Each subscriber buffers up to `capacity` frames; a client that falls
//! further behind starts dropping frames and recovers by reconnecting,
//! which re-bootstraps its state from a snapshot.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::protocol::{FeatureEvent, ProtocolError};

/// Identifier for a live connection. Server-internal, never on the wire.
pub type ConnectionId = Uuid;

/// Snapshot of hub health counters.
#[derive(Debug, Clone, Default)]
pub struct HubStats {
    pub events_broadcast: u64,
    pub active_connections: usize,
}

/// Counters kept in atomics so the fan-out path never takes a lock.
struct AtomicHubStats {
    events_broadcast: AtomicU64,
}

/// The broadcast hub shared by every connection of a relay server.
pub struct BroadcastHub {
    sender: broadcast::Sender<Arc<String>>,
    connections: RwLock<HashSet<ConnectionId>>,
    capacity: usize,
    stats: AtomicHubStats,
}

impl BroadcastHub {
    /// Create a hub whose subscribers each buffer up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            connections: RwLock::new(HashSet::new()),
            capacity,
            stats: AtomicHubStats {
                events_broadcast: AtomicU64::new(0),
            },
        }
    }

    /// Register a connection and hand it a receiver for outbound frames.
    pub async fn attach(&self, id: ConnectionId) -> broadcast::Receiver<Arc<String>> {
        self.connections.write().await.insert(id);
        self.sender.subscribe()
    }

    /// Deregister a connection. Its receiver dies with the connection task.
    pub async fn detach(&self, id: &ConnectionId) -> bool {
        self.connections.write().await.remove(id)
    }

    /// Encode an event once and fan it out to every connection.
    ///
    /// Returns the number of receivers the frame reached (zero when no
    /// client is connected, which is not an error).
    pub fn broadcast(&self, event: &FeatureEvent) -> Result<usize, ProtocolError> {
        let frame = Arc::new(event.encode()?);
        Ok(self.broadcast_encoded(frame))
    }

    /// Fan out a pre-encoded frame. Lock-free.
    pub fn broadcast_encoded(&self, frame: Arc<String>) -> usize {
        let count = self.sender.send(frame).unwrap_or(0);
        self.stats.events_broadcast.fetch_add(1, Ordering::Relaxed);
        count
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_attached(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains(id)
    }

    /// Current counters.
    pub async fn stats(&self) -> HubStats {
        HubStats {
            events_broadcast: self.stats.events_broadcast.load(Ordering::Relaxed),
            active_connections: self.connections.read().await.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
