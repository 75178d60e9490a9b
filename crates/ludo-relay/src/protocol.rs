//! Relay-level wire types. Game messages and voice frames are never
//! interpreted; this module only names the channels, the upgrade routes,
//! and the few events the relay itself emits.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

/// Which kind of traffic a connection carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Structured JSON game messages.
    State,
    /// Raw binary audio frames.
    Voice,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::State => f.write_str("state"),
            ChannelKind::Voice => f.write_str("voice"),
        }
    }
}

/// A frame queued for delivery to one connection.
///
/// State payloads are serialized once per broadcast; every recipient's
/// copy shares that one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    State(Utf8Bytes),
    Voice(Bytes),
}

impl Outbound {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Outbound::State(_) => ChannelKind::State,
            Outbound::Voice(_) => ChannelKind::Voice,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Outbound::State(text) => Message::Text(text),
            Outbound::Voice(data) => Message::Binary(data),
        }
    }
}

/// Endpoint selected by the upgrade request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kind: ChannelKind,
    pub room: String,
}

impl Route {
    /// Parse `/ws/game/{room}` or `/ws/voice/{room}`.
    ///
    /// The room segment must be non-empty and must not contain another `/`.
    pub fn from_path(path: &str) -> Option<Self> {
        let rest = path.strip_prefix("/ws/")?;
        let (family, room) = rest.split_once('/')?;
        let kind = match family {
            "game" => ChannelKind::State,
            "voice" => ChannelKind::Voice,
            _ => return None,
        };
        if room.is_empty() || room.contains('/') {
            return None;
        }
        Some(Self {
            kind,
            room: room.to_string(),
        })
    }

    pub fn path(&self) -> String {
        match self.kind {
            ChannelKind::State => format!("/ws/game/{}", self.room),
            ChannelKind::Voice => format!("/ws/voice/{}", self.room),
        }
    }
}

/// Events the server injects into a room's state channel on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    #[serde(rename = "player_joined")]
    PlayerJoined { player_id: String },
}

impl RoomEvent {
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            RoomEvent::PlayerJoined { player_id } => serde_json::json!({
                "type": "player_joined",
                "player_id": player_id,
            }),
        }
    }
}
