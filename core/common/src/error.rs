//! Common error types for driveremote.

use thiserror::Error;

/// Top-level error type for remote operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A path or resource could not be found on the remote.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An existing remote resource was expected to be a folder.
    #[error("{0} is not a folder")]
    NotAFolder(String),

    /// The transport failed (network, quota, unexpected API status).
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials are missing, invalid or expired beyond refresh.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The remote refused access to a resource.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The operation is not supported by this backend.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether retrying the same call might succeed.
    ///
    /// Only transport failures qualify. Nothing in this workspace retries on
    /// its own; the classification is for callers that want to.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Whether this error reports a missing path or resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
