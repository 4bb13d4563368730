//! Carta relay server: authoritative feature store plus event fan-out.
//!
//! Binds the address given by `CARTA_BIND` (default `127.0.0.1:8000`) and
//! relays feature events between every connected map client.

use carta_collab::{FeatureStore, RelayServer, ServerConfig};
use log::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let bind_addr =
        std::env::var("CARTA_BIND").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let config = ServerConfig {
        bind_addr,
        ..ServerConfig::default()
    };

    info!("starting carta relay on {}", config.bind_addr);
    let server = RelayServer::new(config, FeatureStore::new());
    server.run().await
}
