//! Error types for sweep-core.

use thiserror::Error;

/// Errors that can occur during source extraction.
///
/// Per-file read failures are deliberately not represented here: a single
/// unreadable file is skipped with a warning and never fails the extraction
/// as a whole.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The repository root passed to the extractor does not exist.
    #[error("repository path does not exist: {path}")]
    RootNotFound {
        /// Path that was requested.
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::RootNotFound {
            path: "/tmp/does-not-exist".to_string(),
        };
        assert!(err.to_string().contains("/tmp/does-not-exist"));
    }
}
