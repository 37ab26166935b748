//! Error types for document operations.

use thiserror::Error;

/// Result type for document operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in document operations.
///
/// Only conditions that abort a call chain live here. Degradations such as a
/// malformed object or an unreachable image are reported as
/// [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required storage artifact was absent on load.
    #[error("Required artifact missing: {artifact}")]
    StorageMissing {
        /// Name of the missing artifact.
        artifact: String,
    },

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persistence service rejected an operation.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// An I/O error occurred in a filesystem-backed persistence service.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Loaded artifacts do not describe a consistent document.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}
