//! Error types for LocalCloud.

use thiserror::Error;

/// Common error type for LocalCloud.
#[derive(Error, Debug)]
pub enum LocalCloudError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant automatically.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid caller input (empty name, empty upload, oversized upload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found or not owned by the caller.
    ///
    /// Ownership failures use this variant too, so callers cannot test for
    /// other users' records.
    #[error("{0} not found")]
    NotFound(String),

    /// Storing the requested bytes would exceed the user's storage ceiling.
    #[error("storage quota exceeded: {attempted} bytes requested, {available} bytes available")]
    QuotaExceeded {
        /// Bytes still available under the ceiling.
        available: i64,
        /// Bytes the rejected operation tried to add.
        attempted: i64,
    },

    /// A live sibling folder already uses this name.
    #[error("a folder named '{0}' already exists here")]
    DuplicateName(String),

    /// The external analysis service could not be used.
    ///
    /// Never surfaced from a lifecycle operation; the enrichment runner logs
    /// and drops it.
    #[error("analysis service unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for LocalCloudError {
    fn from(e: sqlx::Error) -> Self {
        LocalCloudError::Database(e.to_string())
    }
}

/// Result type alias for LocalCloud operations.
pub type Result<T> = std::result::Result<T, LocalCloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = LocalCloudError::InvalidInput("folder name is empty".to_string());
        assert_eq!(err.to_string(), "invalid input: folder name is empty");
    }

    #[test]
    fn test_not_found_display() {
        let err = LocalCloudError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_quota_exceeded_display() {
        let err = LocalCloudError::QuotaExceeded {
            available: 100,
            attempted: 250,
        };
        assert_eq!(
            err.to_string(),
            "storage quota exceeded: 250 bytes requested, 100 bytes available"
        );
    }

    #[test]
    fn test_duplicate_name_display() {
        let err = LocalCloudError::DuplicateName("Docs".to_string());
        assert_eq!(err.to_string(), "a folder named 'Docs' already exists here");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LocalCloudError = io_err.into();
        assert!(matches!(err, LocalCloudError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: LocalCloudError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, LocalCloudError::Database(_)));
    }
}
