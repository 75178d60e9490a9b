//! Room records and the HTTP room API.
//!
//! Thin glue around the relay: rooms are stored through [`RoomStore`] and a
//! join announcement is pushed to the room's state channel.

pub mod api;
pub mod store;

pub use api::{router, ApiState};
pub use store::{JoinOutcome, MemoryRoomStore, Room, RoomStatus, RoomStore};
