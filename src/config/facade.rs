//! Entry points for loading `DevlogConfig`.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::DevlogConfig;
use crate::error::DevlogError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from every layer, with the global file taken from the user's config home.
    pub fn load(workspace_root: &Path) -> Result<DevlogConfig, DevlogError> {
        let global = global_file::global_config_path();
        Self::load_layers(workspace_root, global.as_deref())
    }

    /// Load with an explicit global file path (`None` skips the layer).
    pub fn load_layers(
        workspace_root: &Path,
        global_path: Option<&Path>,
    ) -> Result<DevlogConfig, DevlogError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder, global_path)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = merge_policy::add_environment(builder);

        let config: DevlogConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from one file; it replaces the global and workspace file layers.
    pub fn load_from_file(path: &Path) -> Result<DevlogConfig, DevlogError> {
        if !path.is_file() {
            return Err(DevlogError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = merge_policy::add_environment(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Global config path (`$XDG_CONFIG_HOME/devlog/config.toml` or the home fallback).
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Built-in defaults only.
    pub fn default() -> DevlogConfig {
        DevlogConfig::default()
    }
}
