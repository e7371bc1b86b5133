//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::DevlogError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &DevlogError) -> String {
    match e {
        DevlogError::CredentialNotFound { key } => format!(
            "{} (set {} or add it to one of credentials.candidate_files)",
            e, key
        ),
        DevlogError::GitCommand { .. } => format!(
            "{}\nThe document was left on disk; rerun the git steps to publish it.",
            e
        ),
        _ => e.to_string(),
    }
}
