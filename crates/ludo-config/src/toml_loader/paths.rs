//! Where the relay looks for its config, and first-run file creation.

use ludo_common::ConfigError;
use std::path::{Path, PathBuf};
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "ludo";
const CONFIG_FILE: &str = "config.toml";

/// `<platform config dir>/ludo/config.toml`, e.g. `~/.config/ludo/config.toml`
/// on Linux.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    match dirs::config_dir() {
        Some(base) => Ok(config_path_in(&base)),
        None => Err(ConfigError::ParseError(
            "no platform config directory; pass --config explicitly".into(),
        )),
    }
}

fn config_path_in(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(CONFIG_FILE)
}

/// Write the commented default config to `path`, creating parent
/// directories as needed. Overwrites an existing file.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_failure = |what: &str, at: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("cannot {what} {}: {e}", at.display()))
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_failure("create directory", dir, e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| io_failure("write", path, e))?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}
