//! Error types for the index adapter.
//!
//! Every fallible index operation returns [`IndexResult<T>`]. Storage
//! failures pass through unchanged as [`IndexError::Engine`]; the adapter
//! never retries them.

use ordix_core::CoreError;
use ordix_storage::StorageError;
use thiserror::Error;

/// Errors raised by [`SortedIndex`](crate::SortedIndex) and its helpers.
#[derive(Debug, Error)]
pub enum IndexError {
    /// An operation was attempted before `init_as_empty` or on an index
    /// whose keyspace does not exist.
    #[error("index {uri} is not initialized")]
    NotInitialized {
        /// Keyspace URI of the index.
        uri: String,
    },

    /// The index has been dropped.
    #[error("index {uri} has been dropped")]
    Dropped {
        /// Keyspace URI of the index.
        uri: String,
    },

    /// A unique index already binds the key to another record.
    #[error("E11000 duplicate key error index: {index} dup key: {key}")]
    DuplicateKey {
        /// Index name.
        index: String,
        /// The rendered key, e.g. `{ x: 5 }`.
        key: String,
    },

    /// A bulk build received a key that sorts before its predecessor.
    #[error("out of order insert into index {index}: {key} after {previous}")]
    OutOfOrderInsert {
        /// Index name.
        index: String,
        /// The rejected key.
        key: String,
        /// The last accepted key.
        previous: String,
    },

    /// The engine would not hand out a session for the calling thread.
    #[error("no thread context available: {0}")]
    ContextUnavailable(#[source] StorageError),

    /// The underlying engine failed.
    #[error("storage engine error: {0}")]
    Engine(#[from] StorageError),

    /// Index configuration could not be resolved or validated.
    #[error("invalid index configuration: {0}")]
    ConfigurationInvalid(String),

    /// A key tuple could not be encoded or decoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A normal write raced a bulk build of the same index.
    #[error("bulk build in progress on index {index}")]
    BulkLoadInProgress {
        /// Index name.
        index: String,
    },

    /// The keyspace was built for a different key pattern or uniqueness
    /// than the descriptor it is opened with.
    #[error("index {uri} does not match its stored declaration: {detail}")]
    DescriptorMismatch {
        /// Keyspace URI of the index.
        uri: String,
        /// What differs.
        detail: String,
    },

    /// The keyspace was written with a different key format.
    #[error("index {uri} has key format version {found}, expected {expected}")]
    IncompatibleFormat {
        /// Keyspace URI of the index.
        uri: String,
        /// Version recorded in the keyspace metadata.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },
}

impl From<CoreError> for IndexError {
    fn from(e: CoreError) -> Self {
        Self::InvalidKey(e.to_string())
    }
}

impl IndexError {
    /// Whether this is a duplicate-key rejection.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_message() {
        let err = IndexError::DuplicateKey { index: "x_1".into(), key: "{ x: 5 }".into() };
        assert_eq!(err.to_string(), "E11000 duplicate key error index: x_1 dup key: { x: 5 }");
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn core_errors_become_invalid_key() {
        let err: IndexError = CoreError::KeyShape { expected: 2, actual: 1 }.into();
        assert!(matches!(err, IndexError::InvalidKey(ref m) if m.contains("2")));
    }

    #[test]
    fn storage_errors_pass_through() {
        let err: IndexError = StorageError::ReadOnly.into();
        assert!(matches!(err, IndexError::Engine(StorageError::ReadOnly)));
    }
}
