//! Error types for the devlog content pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Filesystem errors raised while indexing, writing, or removing documents
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Atomic write to {path:?} failed: {message}")]
    AtomicWrite { path: PathBuf, message: String },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Top-level pipeline errors
#[derive(Debug, Error)]
pub enum DevlogError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{key} not found in environment or known key files")]
    CredentialNotFound { key: String },

    #[error("Ideas file not found: {0:?}")]
    FeedNotFound(PathBuf),

    #[error("Invalid ideas feed: {0}")]
    FeedInvalid(String),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Generation service connection error: {0}")]
    ProviderConnection(String),

    #[error("Generation service HTTP {status}: {body}")]
    ProviderHttp { status: u16, body: String },

    #[error("Generation request failed after {attempts} attempts (last error: {last_error})")]
    ProviderRetriesExhausted { attempts: u32, last_error: String },

    #[error("Unexpected generation service response: {0}")]
    ProviderResponse(String),

    #[error("Failed to decode model reply: {0}")]
    Decode(String),

    #[error("Model reply rejected: {0}")]
    Validation(String),

    #[error("Command failed: {command}\n{stderr}")]
    GitCommand { command: String, stderr: String },

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Worker task failed: {0}")]
    TaskFailed(String),
}

impl DevlogError {
    /// Whether a single generation attempt that failed this way may be retried.
    ///
    /// Connection failures (including per-attempt timeouts), rate limiting and
    /// the 5xx class are transient; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            DevlogError::ProviderConnection(_) => true,
            DevlogError::ProviderHttp { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Configuration errors abort a run before any unit of work starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DevlogError::ConfigError(_)
                | DevlogError::CredentialNotFound { .. }
                | DevlogError::FeedNotFound(_)
                | DevlogError::FeedInvalid(_)
                | DevlogError::InvalidDate(_)
        )
    }
}

impl From<config::ConfigError> for DevlogError {
    fn from(err: config::ConfigError) -> Self {
        DevlogError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for DevlogError {
    fn from(err: serde_json::Error) -> Self {
        DevlogError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for DevlogError {
    fn from(err: std::io::Error) -> Self {
        DevlogError::StorageError(StorageError::IoError(err))
    }
}
