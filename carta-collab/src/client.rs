//! WebSocket sync client.
//!
//! Owns the connection lifecycle and the frame plumbing: outbound events go
//! through a writer task, inbound frames are decoded and surfaced to the
//! application as [`SyncEvent`]s. Events produced while disconnected land in
//! a bounded pending queue and are replayed on the next successful connect.
//!
//! The client does not keep feature state; that is the
//! [`Reconciler`](crate::reconciler::Reconciler)'s job. On reconnect the
//! application clears its reconciler and lets the server's bootstrap replay
//! rebuild it from scratch.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{FeatureEvent, ProtocolError};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events surfaced to the embedding application.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Connection established.
    Connected,
    /// Connection lost. The local collection is now a stale cache; discard
    /// it and rebuild from the replay that follows the next connect.
    Disconnected,
    /// A protocol event from the relay, bootstrap replay included.
    Remote(FeatureEvent),
}

/// Bounded FIFO of events produced while disconnected.
///
/// Drained and sent in order on the next successful connect.
pub struct PendingQueue {
    queue: VecDeque<FeatureEvent>,
    max_size: usize,
}

impl PendingQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_size,
        }
    }

    /// Queue an event for later replay. Returns false when full.
    pub fn enqueue(&mut self, event: FeatureEvent) -> bool {
        if self.queue.len() >= self.max_size {
            return false;
        }
        self.queue.push_back(event);
        true
    }

    /// Drain all queued events in arrival order.
    pub fn drain(&mut self) -> Vec<FeatureEvent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// The sync client.
pub struct SyncClient {
    state: Arc<RwLock<ConnectionState>>,
    pending: Arc<Mutex<PendingQueue>>,
    outgoing_tx: Option<mpsc::Sender<String>>,
    event_rx: Option<mpsc::Receiver<SyncEvent>>,
    event_tx: mpsc::Sender<SyncEvent>,
    server_url: String,
}

impl SyncClient {
    /// Create a client for the given `ws://` URL.
    pub fn new(server_url: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            pending: Arc::new(Mutex::new(PendingQueue::new(10_000))),
            outgoing_tx: None,
            event_rx: Some(event_rx),
            event_tx,
            server_url: server_url.into(),
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx.take()
    }

    /// Connect to the relay.
    ///
    /// Spawns background tasks for reading and writing WebSocket frames,
    /// then replays anything queued while disconnected.
    pub async fn connect(&mut self) -> Result<(), ProtocolError> {
        *self.state.write().await = ConnectionState::Connecting;

        let ws_stream = match tokio_tungstenite::connect_async(self.server_url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                log::warn!("connect to {} failed: {e}", self.server_url);
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ProtocolError::ConnectionClosed);
            }
        };
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        // Writer task: forward the outgoing channel to the socket.
        let (out_tx, mut out_rx) = mpsc::channel::<String>(256);
        self.outgoing_tx = Some(out_tx);
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if ws_writer.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        });

        *self.state.write().await = ConnectionState::Connected;
        let _ = self.event_tx.send(SyncEvent::Connected).await;

        // Replay events queued while disconnected.
        let queued = self.pending.lock().await.drain();
        if !queued.is_empty() {
            log::info!("replaying {} queued events", queued.len());
            for event in queued {
                self.send(&event).await?;
            }
        }

        // Reader task: decode inbound frames into application events.
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match FeatureEvent::decode(text.as_str()) {
                        Ok(event) => {
                            let _ = event_tx.send(SyncEvent::Remote(event)).await;
                        }
                        Err(e) => log::warn!("dropping malformed frame: {e}"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }

            *state.write().await = ConnectionState::Disconnected;
            let _ = event_tx.send(SyncEvent::Disconnected).await;
        });

        Ok(())
    }

    /// Send an outbound event, queueing it if currently disconnected.
    pub async fn send(&self, event: &FeatureEvent) -> Result<(), ProtocolError> {
        let state = *self.state.read().await;
        if state != ConnectionState::Connected {
            let mut pending = self.pending.lock().await;
            if !pending.enqueue(event.clone()) {
                return Err(ProtocolError::ConnectionClosed);
            }
            return Ok(());
        }

        let frame = event.encode()?;
        if let Some(ref tx) = self.outgoing_tx {
            tx.send(frame)
                .await
                .map_err(|_| ProtocolError::ConnectionClosed)?;
        }
        Ok(())
    }

    /// Get the current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Get the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Number of events waiting for the next connect.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}
