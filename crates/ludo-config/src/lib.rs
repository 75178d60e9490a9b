//! Ludo relay configuration.
//!
//! TOML-based configuration with validation and environment overrides.
//! Every section uses serde defaults, so an empty or partial file is a
//! working config.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ludo_config::{config_to_json, load_config};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod env;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use env::apply_env_overrides;
pub use schema::{LudoConfig, CONFIG_SCHEMA_VERSION};
pub use toml_loader::{create_default_config, default_config_path, load_default, load_from_path};

use ludo_common::ConfigError;
use std::path::Path;

/// Load the effective config.
///
/// Reads `path` when given, otherwise the platform default (creating it on
/// first run). Environment overrides are applied last and the result is
/// validated strictly: a config that cannot serve traffic is an error here.
pub fn load_config(path: Option<&Path>) -> Result<LudoConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::FileNotFound(p.to_path_buf()));
            }
            load_from_path(p)?
        }
        None => load_default()?,
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &LudoConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
