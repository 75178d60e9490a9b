use serde::{Deserialize, Serialize};

/// Listener addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Port for the `/ws/game/{room}` and `/ws/voice/{room}` endpoints.
    pub ws_port: u16,
    /// Port for the HTTP room API.
    pub api_port: u16,
}

impl ServerConfig {
    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.host, self.api_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            ws_port: 8000,
            api_port: 8001,
        }
    }
}
