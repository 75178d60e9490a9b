//! WebSocket gateway: accepts TCP connections, routes the upgrade by path,
//! and hands each accepted socket to a [`ConnectionSession`].

use std::net::SocketAddr;

use ludo_common::{RelayError, Result};
use ludo_config::schema::RelayConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info, warn};

use crate::broadcast::RoomBroadcaster;
use crate::connection::ConnectionSession;
use crate::protocol::Route;

/// Listener for the `/ws/game/{room}` and `/ws/voice/{room}` endpoints.
pub struct Gateway {
    listener: TcpListener,
    broadcaster: RoomBroadcaster,
    relay: RelayConfig,
}

impl Gateway {
    pub async fn bind(addr: &str, broadcaster: RoomBroadcaster, relay: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            broadcaster,
            relay,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Runs until the task is dropped.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("websocket gateway listening on {addr}");
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let broadcaster = self.broadcaster.clone();
                    let relay = self.relay.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_stream(stream, peer, broadcaster, relay).await {
                            warn!(peer = %peer, error = %e, "WS handshake failed");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
}

fn ws_config(relay: &RelayConfig) -> WebSocketConfig {
    let limit = relay.max_frame_bytes as usize;
    let mut config = WebSocketConfig::default();
    config.max_frame_size = Some(limit);
    config.max_message_size = Some(limit);
    config
}

fn not_found(path: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("no websocket endpoint at {path}")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Upgrade one TCP stream and run its session to completion.
async fn handle_stream(
    stream: TcpStream,
    peer: SocketAddr,
    broadcaster: RoomBroadcaster,
    relay: RelayConfig,
) -> Result<()> {
    let mut route = None;
    let callback = |req: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
        match Route::from_path(req.uri().path()) {
            Some(r) => {
                route = Some(r);
                Ok(response)
            }
            None => Err(not_found(req.uri().path())),
        }
    };

    let ws = tokio::time::timeout(
        relay.handshake_timeout(),
        accept_hdr_async_with_config(stream, callback, Some(ws_config(&relay))),
    )
    .await
    .map_err(|_| {
        RelayError::Handshake(format!(
            "timed out after {}s",
            relay.handshake_timeout_secs
        ))
    })?
    .map_err(|e| RelayError::Handshake(e.to_string()))?;

    let Some(route) = route else {
        return Err(RelayError::Handshake("upgrade accepted without a route".into()));
    };

    debug!(peer = %peer, path = %route.path(), "websocket upgraded");
    let session = ConnectionSession::new(route, peer, broadcaster);
    session.run(ws, relay.outbound_buffer as usize).await;
    Ok(())
}
