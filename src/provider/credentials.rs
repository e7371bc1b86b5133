//! API key resolution: environment first, then an ordered list of `KEY=value` files.

use crate::error::DevlogError;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_KEY_NAME: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Environment variable checked first
    #[serde(default = "default_key_name")]
    pub env_var: String,

    /// Key looked up in candidate files
    #[serde(default = "default_key_name")]
    pub key_name: String,

    /// Candidate dotenv-style files, scanned in order. A leading `~` is the home directory.
    #[serde(default = "default_candidate_files")]
    pub candidate_files: Vec<String>,
}

fn default_key_name() -> String {
    DEFAULT_KEY_NAME.to_string()
}

fn default_candidate_files() -> Vec<String> {
    vec!["~/.env".to_string()]
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: default_key_name(),
            key_name: default_key_name(),
            candidate_files: default_candidate_files(),
        }
    }
}

/// Resolve the API key from the environment or the configured files.
pub fn resolve_api_key(config: &CredentialsConfig) -> Result<String, DevlogError> {
    let from_env = std::env::var(&config.env_var).ok();
    let files: Vec<PathBuf> = config
        .candidate_files
        .iter()
        .map(|f| expand_home(f))
        .collect();
    resolve_from(from_env, &files, &config.key_name)
}

/// Resolution with the environment value passed in explicitly.
pub fn resolve_from(
    env_value: Option<String>,
    files: &[PathBuf],
    key_name: &str,
) -> Result<String, DevlogError> {
    if let Some(value) = env_value.map(|v| v.trim().to_string()) {
        if !value.is_empty() {
            debug!("API key resolved from environment");
            return Ok(value);
        }
    }

    for file in files {
        if let Some(value) = read_key_from_file(file, key_name) {
            debug!(file = %file.display(), "API key resolved from file");
            return Ok(value);
        }
    }

    Err(DevlogError::CredentialNotFound {
        key: key_name.to_string(),
    })
}

fn read_key_from_file(path: &Path, key_name: &str) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let prefix = format!("{}=", key_name);
    text.lines()
        .filter_map(|line| line.strip_prefix(&prefix))
        .map(|value| unquote(value.trim()).to_string())
        .find(|value| !value.is_empty())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    } else if raw == "~" {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().to_path_buf();
        }
    }
    PathBuf::from(raw)
}
