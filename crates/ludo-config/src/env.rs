//! Environment variable overrides.
//!
//! `PORT` sets the WebSocket port (the usual convention on hosted
//! platforms); `LUDO_API_PORT` sets the HTTP API port.

use crate::schema::LudoConfig;
use ludo_common::ConfigError;
use tracing::info;

pub const ENV_WS_PORT: &str = "PORT";
pub const ENV_API_PORT: &str = "LUDO_API_PORT";

/// Apply overrides read through `lookup`.
///
/// Takes a lookup function rather than reading the process environment
/// directly so callers (and tests) control the source.
pub fn apply_env_overrides<F>(config: &mut LudoConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = parse_port(&lookup, ENV_WS_PORT)? {
        info!(port, "ws port overridden from {ENV_WS_PORT}");
        config.server.ws_port = port;
    }
    if let Some(port) = parse_port(&lookup, ENV_API_PORT)? {
        info!(port, "api port overridden from {ENV_API_PORT}");
        config.server.api_port = port;
    }
    Ok(())
}

fn parse_port<F>(lookup: &F, key: &str) -> Result<Option<u16>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError(format!("{key}={raw:?} is not a port: {e}"))),
    }
}
