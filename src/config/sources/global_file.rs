//! Global config file source: $XDG_CONFIG_HOME/devlog/config.toml or ~/.config/devlog/config.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to the global config file, whether or not it exists.
pub fn global_config_path() -> Option<PathBuf> {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => BaseDirs::new()?.home_dir().join(".config"),
    };
    Some(config_home.join("devlog").join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: Option<&Path>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match path {
        Some(path) if path.is_file() => Ok(builder.add_source(File::from(path).required(false))),
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            Ok(builder)
        }
        None => Ok(builder),
    }
}
