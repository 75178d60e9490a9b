//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod relay;
mod rooms;
mod server;

pub use logging::*;
pub use relay::*;
pub use rooms::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LudoConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub rooms: RoomsConfig,
    pub logging: LoggingConfig,
}
