//! Common error types for KeeBridge.

use thiserror::Error;

/// Top-level error type for KeeBridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Vault file, key file or entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials were rejected or the container could not be read.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Operation requires an unlocked vault.
    #[error("Database locked")]
    Locked,

    /// The vault changed on disk and could not be reopened.
    #[error("Reload failed: {0}")]
    ReloadFailure(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_locked_message() {
        assert_eq!(Error::Locked.to_string(), "Database locked");
    }
}
