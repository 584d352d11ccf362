//! Error types for the seed-snapshot crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or validating a seed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot file at '{path}': {message}")]
    IoError {
        /// Path to the snapshot file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The snapshot JSON is malformed or missing required fields.
    #[error("invalid snapshot JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The snapshot version is not supported.
    #[error("unsupported snapshot version: expected {expected}, found {actual}")]
    UnsupportedVersion {
        /// Expected version number.
        expected: u32,
        /// Actual version found in the snapshot.
        actual: u32,
    },

    /// The user identity key is empty or carries surrounding whitespace.
    #[error("user email must be non-empty without surrounding whitespace: '{value}'")]
    InvalidIdentityKey {
        /// The rejected identity key.
        value: String,
    },

    /// The user display name is blank.
    #[error("user name must not be blank")]
    BlankDisplayName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_formats_correctly() {
        let err = SnapshotError::IoError {
            path: PathBuf::from("/tmp/seed.json"),
            message: "file not found".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read snapshot file at '/tmp/seed.json': file not found"
        );
    }

    #[test]
    fn version_error_formats_correctly() {
        let err = SnapshotError::UnsupportedVersion {
            expected: 1,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "unsupported snapshot version: expected 1, found 3"
        );
    }

    #[test]
    fn identity_key_error_includes_value() {
        let err = SnapshotError::InvalidIdentityKey {
            value: " a@x.com".to_owned(),
        };
        assert!(err.to_string().contains("' a@x.com'"));
    }
}
