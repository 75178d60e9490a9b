//! Per-connection session: register, relay inbound frames, deregister.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use ludo_common::ConnectionId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::broadcast::RoomBroadcaster;
use crate::protocol::{ChannelKind, Outbound, Route};
use crate::registry::ConnectionHandle;

/// Lifecycle of a session. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgraded but not yet registered.
    Pending,
    /// Registered and relaying.
    Active,
    /// Deregistered; terminal.
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Close frame or end of stream.
    PeerClosed,
    /// The transport reported an error while reading.
    ReadError(String),
    /// The peer sent something the channel cannot carry.
    Protocol(String),
    /// Writing to the socket failed.
    WriteFailed(String),
}

/// What one inbound frame asks the session to do.
#[derive(Debug, PartialEq)]
enum Inbound {
    State(serde_json::Value),
    Voice(Bytes),
    Ping(Bytes),
    Ignore,
    Close(CloseReason),
}

/// Map an inbound frame to an action for a session of `kind`.
fn classify(kind: ChannelKind, frame: Option<Result<Message, tungstenite::Error>>) -> Inbound {
    let msg = match frame {
        None => return Inbound::Close(CloseReason::PeerClosed),
        Some(Err(e)) => return Inbound::Close(CloseReason::ReadError(e.to_string())),
        Some(Ok(msg)) => msg,
    };

    match (kind, msg) {
        (_, Message::Close(_)) => Inbound::Close(CloseReason::PeerClosed),
        (_, Message::Ping(data)) => Inbound::Ping(data),
        (ChannelKind::State, Message::Text(text)) => {
            match serde_json::from_str::<serde_json::Value>(text.as_str()) {
                Ok(value) => Inbound::State(value),
                Err(e) => Inbound::Close(CloseReason::Protocol(format!("invalid JSON: {e}"))),
            }
        }
        (ChannelKind::State, Message::Binary(_)) => Inbound::Close(CloseReason::Protocol(
            "binary frame on state channel".into(),
        )),
        (ChannelKind::Voice, Message::Binary(data)) => Inbound::Voice(data),
        _ => Inbound::Ignore,
    }
}

/// Drives one WebSocket connection from registration to cleanup.
pub struct ConnectionSession {
    id: ConnectionId,
    route: Route,
    peer: SocketAddr,
    state: SessionState,
    broadcaster: RoomBroadcaster,
}

impl ConnectionSession {
    pub fn new(route: Route, peer: SocketAddr, broadcaster: RoomBroadcaster) -> Self {
        Self {
            id: ConnectionId::new(),
            route,
            peer,
            state: SessionState::Pending,
            broadcaster,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(
            conn = %self.id.short(),
            from = ?self.state,
            to = ?next,
            "session state"
        );
        self.state = next;
    }

    /// Run the session to completion.
    ///
    /// Reading and writing run on separate tasks, so a broadcast from this
    /// session's reader never waits on its own outbound drain. The
    /// registry entry is removed on every exit path before this returns.
    /// Faults end only this session.
    pub async fn run<S>(mut self, ws: WebSocketStream<S>, outbound_buffer: usize) -> CloseReason
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let room = self.route.room.clone();
        let kind = self.route.kind;

        // 1. Register our outbound queue.
        let (tx, rx) = mpsc::channel(outbound_buffer.max(1));
        let handle = ConnectionHandle::new(self.id.clone(), tx);
        let registry = self.broadcaster.registry().clone();
        registry.connect(&room, kind, handle.clone()).await;
        self.transition(SessionState::Active);

        info!(
            peer = %self.peer,
            conn = %self.id.short(),
            room = %room,
            kind = %kind,
            "client joined"
        );

        // 2. Writer task owns the sink; this task keeps the stream.
        let (sink, mut stream) = ws.split();
        let (control, control_rx) = mpsc::unbounded_channel();
        let mut writer = tokio::spawn(write_loop(sink, rx, control_rx));
        let mut writer_done = false;

        let reason = loop {
            tokio::select! {
                result = &mut writer => {
                    writer_done = true;
                    break match result {
                        Ok(Err(e)) => CloseReason::WriteFailed(e.to_string()),
                        Ok(Ok(())) => CloseReason::WriteFailed("writer stopped".into()),
                        Err(e) => CloseReason::WriteFailed(e.to_string()),
                    };
                }

                // This client's socket → the room
                frame = stream.next() => {
                    match classify(kind, frame) {
                        Inbound::State(value) => {
                            self.broadcaster.broadcast_state(&room, &value).await;
                        }
                        Inbound::Voice(data) => {
                            self.broadcaster.broadcast_voice(&room, data).await;
                        }
                        Inbound::Ping(data) => {
                            let _ = control.send(Control::Pong(data));
                        }
                        Inbound::Ignore => {}
                        Inbound::Close(reason) => break reason,
                    }
                }
            }
        };

        // 3. Cleanup.
        registry.disconnect(&room, &handle).await;
        self.transition(SessionState::Closed);

        match &reason {
            CloseReason::PeerClosed => info!(
                peer = %self.peer,
                conn = %self.id.short(),
                room = %room,
                kind = %kind,
                "client left"
            ),
            other => warn!(
                peer = %self.peer,
                conn = %self.id.short(),
                room = %room,
                kind = %kind,
                reason = ?other,
                "session closed on fault"
            ),
        }

        if !writer_done {
            let _ = control.send(Control::Shutdown);
            if tokio::time::timeout(WRITER_GRACE, &mut writer).await.is_err() {
                writer.abort();
            }
        }
        reason
    }
}

/// Out-of-band requests from the reader to the writer task.
#[derive(Debug)]
enum Control {
    Pong(Bytes),
    Shutdown,
}

/// How long the writer gets to send a close frame after deregistration.
const WRITER_GRACE: Duration = Duration::from_secs(1);

/// Drain the outbound queue into the socket until told to stop or a write
/// fails.
async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    mut control: mpsc::UnboundedReceiver<Control>,
) -> Result<(), tungstenite::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            ctl = control.recv() => match ctl {
                Some(Control::Pong(data)) => sink.send(Message::Pong(data)).await?,
                Some(Control::Shutdown) | None => {
                    let _ = sink.close().await;
                    return Ok(());
                }
            },

            // Frames fanned out to us → this client's socket
            Some(frame) = rx.recv() => {
                sink.send(frame.into_message()).await?;
            }
        }
    }
}
