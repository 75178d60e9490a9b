use serde::{Deserialize, Serialize};

/// Room record defaults used by the HTTP room API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Seats per room (valid range: 2-4).
    pub max_players: u32,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self { max_players: 4 }
    }
}
