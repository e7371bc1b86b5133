//! Workspace config file source: config/devlog.toml and config/{env}.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;

pub const ENV_NAME_VAR: &str = "DEVLOG_ENV";

/// Add workspace config files to builder.
/// Precedence: config/devlog.toml (base) then config/{DEVLOG_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = workspace_root.join("config");
    let env_name = std::env::var(ENV_NAME_VAR).unwrap_or_else(|_| "development".to_string());

    let mut builder = builder;

    let base_config_path = config_dir.join("devlog.toml");
    if base_config_path.is_file() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    let env_config_path = config_dir.join(format!("{}.toml", env_name));
    if env_config_path.is_file() {
        builder = builder.add_source(File::from(env_config_path).required(false));
    }

    Ok(builder)
}
