//! `RelayServer`: wires the registry, broadcaster, gateway, and room API.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use ludo_common::Result;
use ludo_config::LudoConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::broadcast::RoomBroadcaster;
use crate::gateway::Gateway;
use crate::registry::ConnectionRegistry;
use crate::rooms::{self, ApiState, MemoryRoomStore, RoomStore};

/// The relay process: one WebSocket gateway and one HTTP API sharing a
/// single registry.
pub struct RelayServer {
    config: LudoConfig,
    broadcaster: RoomBroadcaster,
    store: Arc<dyn RoomStore>,
    start_time: Instant,
}

impl RelayServer {
    /// Create a server backed by the in-memory room store.
    pub fn new(config: LudoConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryRoomStore::new()))
    }

    pub fn with_store(config: LudoConfig, store: Arc<dyn RoomStore>) -> Self {
        let registry = ConnectionRegistry::new();
        let broadcaster = RoomBroadcaster::new(registry, config.relay.send_timeout());
        Self {
            config,
            broadcaster,
            store,
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &LudoConfig {
        &self.config
    }

    /// The broadcaster other components use to push events into rooms.
    pub fn broadcaster(&self) -> &RoomBroadcaster {
        &self.broadcaster
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        self.broadcaster.registry()
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        rooms::router(ApiState {
            broadcaster: self.broadcaster.clone(),
            store: Arc::clone(&self.store),
            max_players: self.config.rooms.max_players,
            start_time: self.start_time,
        })
    }

    /// Bind the WebSocket gateway on the configured address.
    pub async fn bind_gateway(&self) -> Result<Gateway> {
        Gateway::bind(
            &self.config.server.ws_addr(),
            self.broadcaster.clone(),
            self.config.relay.clone(),
        )
        .await
    }

    /// Serve both listeners until one of them stops.
    pub async fn run(self) -> Result<()> {
        let gateway = self.bind_gateway().await?;
        let api_addr = self.config.server.api_addr();
        let api_listener = TcpListener::bind(&api_addr).await?;
        info!("room api listening on {api_addr}");

        let router = self.router();
        tokio::select! {
            _ = gateway.run() => Ok(()),
            served = async { axum::serve(api_listener, router).await } => {
                served?;
                Ok(())
            }
        }
    }
}
