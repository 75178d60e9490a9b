//! ludo-relay: real-time relay for Ludo rooms.
//!
//! Clients join a room over one of two WebSocket endpoints:
//! `/ws/game/{room}` carries JSON game messages, `/ws/voice/{room}` carries
//! opaque binary audio frames. Every inbound unit is fanned out to all
//! members of the same room and channel, the sender included. Delivery is
//! best-effort; a failing peer never affects anyone else.
//!
//! A small HTTP API (room create / join / health) sits next to the gateway
//! and announces joins through the same [`RoomBroadcaster`].

pub mod broadcast;
pub mod connection;
pub mod gateway;
pub mod protocol;
pub mod registry;
pub mod rooms;
pub mod server;


pub use broadcast::{BroadcastReport, BroadcastStatsSnapshot, RoomBroadcaster};
pub use connection::{CloseReason, ConnectionSession, SessionState};
pub use gateway::Gateway;
pub use protocol::{ChannelKind, Outbound, RoomEvent, Route};
pub use registry::{ConnectionHandle, ConnectionRegistry, SendError};
pub use server::RelayServer;
