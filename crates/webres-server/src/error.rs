//! Server error types.

use thiserror::Error;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors from the HTTP transport layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// Binding or accepting on the listener socket failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured alias is not a usable mount prefix.
    #[error("invalid alias '{alias}': {reason}")]
    InvalidAlias {
        /// Configured alias value.
        alias: String,
        /// Why it was rejected.
        reason: String,
    },
}
