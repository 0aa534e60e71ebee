//! Storage error types.

use thiserror::Error;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("failed to open database: {0}")]
    Open(String),

    /// A keyspace was expected to exist but does not.
    #[error("keyspace not found: {0}")]
    KeyspaceNotFound(String),

    /// A keyspace already exists with a different configuration.
    #[error("keyspace already exists with a different configuration: {0}")]
    KeyspaceExists(String),

    /// A keyspace name cannot be used.
    #[error("invalid keyspace name: {0:?}")]
    InvalidName(String),

    /// A configuration string was malformed or rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A transaction error occurred.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A write was attempted through a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// The engine has no capacity left for the requested resource.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation is not supported.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// An error reported by the backend itself.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
