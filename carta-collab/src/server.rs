//! Relay server: authoritative store plus broadcast discipline.
//!
//! Architecture:
//! ```text
//! Client A ──┐  inbound events                ┌── owns FeatureStore
//!            ├── connection tasks ── mpsc ──► relay loop
//! Client B ──┘                                └── apply, then fan out
//!                         ▲                          │
//!                         │ frames            BroadcastHub
//!                         └──────────────────────────┘
//! ```
//!
//! Every inbound event funnels through one mpsc channel into the relay
//! loop, which owns the store outright: arrival order on that channel is
//! the global mutation order, so last-write-wins needs no further
//! machinery and the store needs no lock. A mutation is applied in full
//! before its broadcast is issued.
//!
//! A new connection is bootstrapped by replaying the current snapshot to
//! that socket alone, one synthetic `created` frame per record. This is the
//! only state-transfer mechanism; there is no "get all" request type.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::broadcast::{BroadcastHub, ConnectionId};
use crate::feature::Feature;
use crate::protocol::FeatureEvent;
use crate::store::FeatureStore;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Frames buffered per connection before a lagging client drops
    pub broadcast_capacity: usize,
    /// Queue depth between connection tasks and the relay loop
    pub relay_queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            broadcast_capacity: 256,
            relay_queue_depth: 1024,
        }
    }
}

/// Server-wide statistics.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub events_applied: u64,
    pub frames_rejected: u64,
}

/// Requests funneled into the relay loop, the store's single mutation path.
enum RelayCommand {
    /// A connection joined; reply with the full current feature set.
    Bootstrap {
        reply: oneshot::Sender<Vec<Feature>>,
    },
    /// An inbound protocol event from some connection.
    Apply { event: FeatureEvent },
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    store: FeatureStore,
    hub: Arc<BroadcastHub>,
    stats: Arc<RwLock<ServerStats>>,
}

impl RelayServer {
    /// Create a relay around an injected store.
    ///
    /// The store lives exactly as long as the server; it moves into the
    /// relay loop when [`run`](Self::run) starts and is dropped with it.
    pub fn new(config: ServerConfig, store: FeatureStore) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.broadcast_capacity));
        Self {
            config,
            store,
            hub,
            stats: Arc::new(RwLock::new(ServerStats::default())),
        }
    }

    /// Create with default configuration and an empty store.
    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default(), FeatureStore::new())
    }

    /// Get server statistics.
    pub async fn stats(&self) -> ServerStats {
        self.stats.read().await.clone()
    }

    /// Get the configured bind address.
    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    /// Bind and serve until the process exits.
    ///
    /// Consumes the server: the store moves into the relay loop task, which
    /// from here on is the only code that can touch it.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        log::info!("relay listening on {}", self.config.bind_addr);

        let (relay_tx, relay_rx) = mpsc::channel(self.config.relay_queue_depth);
        tokio::spawn(relay_loop(
            self.store,
            relay_rx,
            self.hub.clone(),
            self.stats.clone(),
        ));

        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("tcp connection from {addr}");

            let hub = self.hub.clone();
            let relay_tx = relay_tx.clone();
            let stats = self.stats.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, hub, relay_tx, stats).await {
                    log::error!("connection error from {addr}: {e}");
                }
            });
        }
    }
}

/// The store's single mutation path.
///
/// Commands arrive in one global order; each mutation is applied in full
/// before its broadcast is issued, so fan-out never observes a half-applied
/// store.
async fn relay_loop(
    mut store: FeatureStore,
    mut rx: mpsc::Receiver<RelayCommand>,
    hub: Arc<BroadcastHub>,
    stats: Arc<RwLock<ServerStats>>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            RelayCommand::Bootstrap { reply } => {
                let _ = reply.send(store.snapshot());
            }
            RelayCommand::Apply { event } => {
                if !apply_event(&mut store, &event) {
                    // Absent-target delete or edit: absorbed, not relayed.
                    log::debug!("ignoring event for unknown feature {}", event.id());
                    continue;
                }
                stats.write().await.events_applied += 1;

                // Fan out to every connection, the originator included; its
                // reconciler already holds the feature and drops the echo.
                match hub.broadcast(&event) {
                    Ok(count) => log::trace!("relayed {} to {count} clients", event.id()),
                    Err(e) => log::error!("failed to encode broadcast frame: {e}"),
                }
            }
        }
    }
}

/// Apply one event to the store. Returns whether it should be rebroadcast.
fn apply_event(store: &mut FeatureStore, event: &FeatureEvent) -> bool {
    match event {
        FeatureEvent::Created { id, geometry } => {
            store.upsert(id.clone(), geometry.clone());
            true
        }
        FeatureEvent::Deleted { id } => store.remove(id).is_some(),
        FeatureEvent::Edited { id, geometry } => {
            if store.contains(id) {
                store.upsert(id.clone(), geometry.clone());
                true
            } else {
                false
            }
        }
    }
}

/// Serve a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<BroadcastHub>,
    relay_tx: mpsc::Sender<RelayCommand>,
    stats: Arc<RwLock<ServerStats>>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let conn_id: ConnectionId = Uuid::new_v4();
    log::info!("client {conn_id} connected from {addr}");

    {
        let mut s = stats.write().await;
        s.total_connections += 1;
        s.active_connections += 1;
    }

    // Subscribe before requesting the snapshot so nothing falls in the gap
    // between replay and live broadcasts. An event landing in the overlap
    // is delivered twice; receivers absorb duplicates by id.
    let mut broadcast_rx = hub.attach(conn_id).await;

    // Replay the full store to this connection only.
    let (reply_tx, reply_rx) = oneshot::channel();
    let snapshot = if relay_tx
        .send(RelayCommand::Bootstrap { reply: reply_tx })
        .await
        .is_ok()
    {
        reply_rx.await.unwrap_or_default()
    } else {
        Vec::new()
    };

    log::debug!("replaying {} features to {conn_id}", snapshot.len());
    let mut replay_failed = false;
    for feature in snapshot {
        match FeatureEvent::from_snapshot(feature).encode() {
            Ok(frame) => {
                if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                    replay_failed = true;
                    break;
                }
            }
            Err(e) => log::error!("failed to encode replay frame: {e}"),
        }
    }

    if !replay_failed {
        loop {
            tokio::select! {
                inbound = ws_receiver.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match FeatureEvent::decode(text.as_str()) {
                                Ok(event) => {
                                    if relay_tx.send(RelayCommand::Apply { event }).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    // One bad frame must never take down the
                                    // relay or this client's neighbours.
                                    stats.write().await.frames_rejected += 1;
                                    log::warn!("dropping malformed frame from {conn_id}: {e}");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if ws_sender.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("client {conn_id} disconnected");
                            break;
                        }
                        Some(Err(e)) => {
                            log::warn!("websocket error from {conn_id}: {e}");
                            break;
                        }
                        _ => {}
                    }
                }

                outbound = broadcast_rx.recv() => {
                    match outbound {
                        Ok(frame) => {
                            if ws_sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            // The client missed frames; it will hold stale
                            // state until it reconnects and re-bootstraps.
                            log::warn!("client {conn_id} lagged by {n} frames");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    hub.detach(&conn_id).await;
    {
        let mut s = stats.write().await;
        s.active_connections -= 1;
    }
    log::info!("client {conn_id} detached");

    Ok(())
}
