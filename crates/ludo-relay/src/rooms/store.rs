//! Room document storage.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ludo_common::{new_id, RelayError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// Room lifecycle as recorded by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

/// A stored room document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub room_code: String,
    pub created_by: String,
    pub status: RoomStatus,
    /// Player ids in join order.
    pub players: Vec<String>,
    pub max_players: u32,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// New waiting room seated with its creator.
    pub fn new(room_code: &str, created_by: &str, max_players: u32) -> Self {
        Self {
            id: new_id(),
            room_code: room_code.to_string(),
            created_by: created_by.to_string(),
            status: RoomStatus::Waiting,
            players: vec![created_by.to_string()],
            max_players,
            created_at: Utc::now(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }
}

/// Result of recording a player on a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Added,
    AlreadySeated,
    Full,
    UnknownRoom,
}

/// Persistence for room documents.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert a room, returning its document id.
    async fn create_room(&self, room: Room) -> Result<String>;

    /// Seat `player_id` in the room with `room_code`.
    async fn add_player(&self, room_code: &str, player_id: &str) -> Result<JoinOutcome>;

    async fn get_room(&self, room_code: &str) -> Result<Option<Room>>;

    async fn room_count(&self) -> Result<usize>;

    /// Short backend name for status reporting.
    fn backend(&self) -> &'static str;
}

/// Process-memory store keyed by room code.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<String, Room>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create_room(&self, room: Room) -> Result<String> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.room_code) {
            return Err(RelayError::Store(format!(
                "room {} already exists",
                room.room_code
            )));
        }
        let id = room.id.clone();
        info!(room = %room.room_code, created_by = %room.created_by, "room created");
        rooms.insert(room.room_code.clone(), room);
        Ok(id)
    }

    async fn add_player(&self, room_code: &str, player_id: &str) -> Result<JoinOutcome> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_code) else {
            return Ok(JoinOutcome::UnknownRoom);
        };
        if room.players.iter().any(|p| p == player_id) {
            return Ok(JoinOutcome::AlreadySeated);
        }
        if room.is_full() {
            return Ok(JoinOutcome::Full);
        }
        room.players.push(player_id.to_string());
        Ok(JoinOutcome::Added)
    }

    async fn get_room(&self, room_code: &str) -> Result<Option<Room>> {
        Ok(self.rooms.read().await.get(room_code).cloned())
    }

    async fn room_count(&self) -> Result<usize> {
        Ok(self.rooms.read().await.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
