//! # carta-collab — real-time map feature collaboration
//!
//! Several clients co-edit one shared set of geographic map features; every
//! draw, edit, and delete converges on all connected views through a central
//! relay.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     WebSocket      ┌─────────────┐
//! │ SyncClient  │ ◄─────────────────► │ RelayServer │
//! │ (per user)  │    JSON frames      │ (central)   │
//! └──────┬──────┘                     └──────┬──────┘
//!        │                                   │
//!        ▼                                   ▼
//! ┌─────────────┐                     ┌─────────────┐
//! │ Reconciler  │                     │ FeatureStore│
//! │ (local map) │                     │ (authority) │
//! └─────────────┘                     └──────┬──────┘
//!                                            │
//!                                    ┌───────┴───────┐
//!                                    │ BroadcastHub  │
//!                                    │ (fan-out)     │
//!                                    └───────────────┘
//! ```
//!
//! Three events (`created`, `deleted`, `edited`) are the whole protocol.
//! The relay applies each inbound event to the authoritative store on a
//! single sequential path, then fans the frame out to every connection.
//! A joining client is bootstrapped by replaying the current store to it as
//! synthetic `created` events. Receivers check presence by id before acting,
//! so duplicate delivery and echoes are harmless, and two clients racing on
//! the same feature resolve by last-write-wins.
//!
//! ## Modules
//!
//! - [`geometry`] — GeoJSON-shaped geometry model (no circle variant)
//! - [`feature`] — feature records and identity assignment
//! - [`store`] — authoritative server-side feature store
//! - [`protocol`] — the three-event wire vocabulary, JSON text frames
//! - [`broadcast`] — encode-once fan-out to all connections
//! - [`server`] — WebSocket relay server
//! - [`client`] — WebSocket sync client with a pending queue
//! - [`reconciler`] — client-local collection; local/remote entry points

pub mod broadcast;
pub mod client;
pub mod feature;
pub mod geometry;
pub mod protocol;
pub mod reconciler;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use broadcast::{BroadcastHub, ConnectionId, HubStats};
pub use client::{ConnectionState, PendingQueue, SyncClient, SyncEvent};
pub use feature::{Feature, FeatureId};
pub use geometry::{Geometry, GeometryKind, Position};
pub use protocol::{FeatureEvent, ProtocolError};
pub use reconciler::{Reconciler, RenderSurface};
pub use server::{RelayServer, ServerConfig, ServerStats};
pub use store::FeatureStore;
