//! Full configuration validation.
//!
//! Checks numeric ranges and listener sanity, collecting every problem
//! into a single `ConfigError`.

mod helpers;


use crate::schema::LudoConfig;
use ludo_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LudoConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_relay(&mut errors, config);
    validate_range(
        &mut errors,
        "rooms.max_players",
        config.rooms.max_players,
        2,
        4,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &LudoConfig) {
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    validate_range(
        errors,
        "server.ws_port",
        u32::from(config.server.ws_port),
        1,
        65535,
    );
    validate_range(
        errors,
        "server.api_port",
        u32::from(config.server.api_port),
        1,
        65535,
    );
    if config.server.ws_port == config.server.api_port {
        errors.push(format!(
            "server.ws_port and server.api_port are both {}",
            config.server.ws_port
        ));
    }
}

fn validate_relay(errors: &mut Vec<String>, config: &LudoConfig) {
    validate_range(
        errors,
        "relay.outbound_buffer",
        config.relay.outbound_buffer,
        1,
        65536,
    );
    validate_range(
        errors,
        "relay.send_timeout_ms",
        config.relay.send_timeout_ms,
        10,
        60_000,
    );
    validate_range(
        errors,
        "relay.handshake_timeout_secs",
        config.relay.handshake_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "relay.max_frame_bytes",
        config.relay.max_frame_bytes,
        1024,
        16 * 1024 * 1024,
    );
}
