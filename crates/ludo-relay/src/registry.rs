//! Connection registry: maps room identifiers to the connections subscribed
//! on each channel kind.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use ludo_common::ConnectionId;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::protocol::{ChannelKind, Outbound};

/// Why a frame could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,

    #[error("outbound queue full past timeout")]
    Timeout,
}

/// Send capability for one live connection.
///
/// Equality and hashing use the connection id only, so two handles compare
/// equal exactly when they refer to the same connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Outbound>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Queue a frame, waiting at most `timeout` for queue space.
    pub async fn send(&self, frame: Outbound, timeout: Duration) -> Result<(), SendError> {
        self.tx
            .send_timeout(frame, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => SendError::Timeout,
                SendTimeoutError::Closed(_) => SendError::Closed,
            })
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl Hash for ConnectionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Both membership sets of one room.
#[derive(Default)]
struct RoomMembers {
    state: HashMap<ConnectionId, ConnectionHandle>,
    voice: HashMap<ConnectionId, ConnectionHandle>,
}

impl RoomMembers {
    fn set(&self, kind: ChannelKind) -> &HashMap<ConnectionId, ConnectionHandle> {
        match kind {
            ChannelKind::State => &self.state,
            ChannelKind::Voice => &self.voice,
        }
    }

    fn set_mut(&mut self, kind: ChannelKind) -> &mut HashMap<ConnectionId, ConnectionHandle> {
        match kind {
            ChannelKind::State => &mut self.state,
            ChannelKind::Voice => &mut self.voice,
        }
    }

    fn is_empty(&self) -> bool {
        self.state.is_empty() && self.voice.is_empty()
    }
}

/// Thread-safe room membership store.
///
/// Cloning is cheap and every clone shares the same state. A single lock
/// guards all rooms; critical sections are short map operations and no
/// send ever happens while it is held.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    rooms: Arc<RwLock<HashMap<String, RoomMembers>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` in `(room, kind)`, creating the set on first use.
    ///
    /// Idempotent. Returns true if the handle was not already present.
    pub async fn connect(&self, room: &str, kind: ChannelKind, handle: ConnectionHandle) -> bool {
        let mut rooms = self.rooms.write().await;
        let set = rooms.entry(room.to_string()).or_default().set_mut(kind);
        let inserted = match set.entry(handle.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
            Entry::Occupied(_) => false,
        };
        debug!(room, kind = %kind, members = set.len(), inserted, "registry connect");
        inserted
    }

    /// Remove `handle` from both channel kinds of `room`.
    ///
    /// Absent handles and unknown rooms are a no-op. Returns true if the
    /// handle was removed from at least one set.
    pub async fn disconnect(&self, room: &str, handle: &ConnectionHandle) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };
        let from_state = members.state.remove(&handle.id).is_some();
        let from_voice = members.voice.remove(&handle.id).is_some();
        if members.is_empty() {
            rooms.remove(room);
        }
        debug!(
            room,
            conn = %handle.id.short(),
            from_state,
            from_voice,
            "registry disconnect"
        );
        from_state || from_voice
    }

    /// Snapshot of the handles currently in `(room, kind)`.
    ///
    /// The returned vector is detached from the registry, so callers may
    /// iterate and await while other sessions connect or disconnect.
    pub async fn members(&self, room: &str, kind: ChannelKind) -> Vec<ConnectionHandle> {
        self.rooms
            .read()
            .await
            .get(room)
            .map(|members| members.set(kind).values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of connections in `(room, kind)`.
    pub async fn member_count(&self, room: &str, kind: ChannelKind) -> usize {
        self.rooms
            .read()
            .await
            .get(room)
            .map_or(0, |members| members.set(kind).len())
    }

    /// Number of rooms with at least one live connection.
    pub async fn room_count(&self) -> usize {
        self.rooms
            .read()
            .await
            .values()
            .filter(|members| !members.is_empty())
            .count()
    }

    /// Total live connections across all rooms for one channel kind.
    pub async fn connection_count(&self, kind: ChannelKind) -> usize {
        self.rooms
            .read()
            .await
            .values()
            .map(|members| members.set(kind).len())
            .sum()
    }
}
