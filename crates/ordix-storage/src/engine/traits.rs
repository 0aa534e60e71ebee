//! Core storage engine traits.
//!
//! - [`StorageEngine`] - The main entry point for storage operations
//! - [`Transaction`] - ACID transaction support with read/write operations
//! - [`Cursor`] - Ordered iteration over key-value pairs
//! - [`Session`] - A per-thread engine handle
//!
//! Data lives in named *keyspaces*. A keyspace is an ordered key/value space
//! isolated from every other keyspace; keys within it sort bytewise.

use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use super::StorageError;

/// A key-value pair returned by cursor operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Result type for cursor operations that return a key-value pair.
pub type CursorResult = Result<Option<KeyValue>, StorageError>;

/// Identifier of an engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a session id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Approximate size and shape of one keyspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyspaceStats {
    /// Number of key/value pairs.
    pub entries: u64,
    /// Total bytes of all keys.
    pub key_bytes: u64,
    /// Total bytes of all values.
    pub value_bytes: u64,
}

impl KeyspaceStats {
    /// Keys plus values, in bytes.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.key_bytes + self.value_bytes
    }
}

/// A storage engine that provides transactional key-value operations.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use ordix_storage::{StorageEngine, Transaction};
///
/// fn example<E: StorageEngine>(engine: &E) -> Result<(), StorageError> {
///     let mut tx = engine.begin_write()?;
///     tx.create_keyspace("my_table", "")?;
///     tx.put("my_table", b"key", b"value")?;
///     tx.commit()?;
///
///     let tx = engine.begin_read()?;
///     let value = tx.get("my_table", b"key")?;
///     Ok(())
/// }
/// ```
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// The per-thread session type handed out by [`open_session`](Self::open_session).
    type Session: Session;

    /// Begin a read-only transaction.
    ///
    /// Read transactions provide a consistent snapshot of the database.
    /// Multiple read transactions can run concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Begin a read-write transaction.
    ///
    /// Depending on the backend, write transactions may be serialized.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Lease a session for the calling thread.
    ///
    /// Sessions are released when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ResourceExhausted`] when the engine has no
    /// session capacity left.
    fn open_session(&self) -> Result<Self::Session, StorageError>;

    /// Flush any buffered data to durable storage.
    ///
    /// The default implementation does nothing, as most backends handle
    /// durability on commit.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A per-thread handle into the engine.
///
/// Sessions are never shared between threads while in use, but may move
/// between threads when idle.
pub trait Session: Send {
    /// The identifier of this session, unique among live sessions.
    fn id(&self) -> SessionId;
}

/// A transaction that provides ACID key-value operations.
///
/// Write transactions must be explicitly committed; dropping without
/// committing rolls back changes.
pub trait Transaction {
    /// The cursor type for iteration.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Get a value by key from a keyspace.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, keyspace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Put a key-value pair, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read-only transaction.
    fn put(&mut self, keyspace: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.
    ///
    /// Returns `Ok(true)` if the key was deleted, `Ok(false)` if it didn't exist.
    fn delete(&mut self, keyspace: &str, key: &[u8]) -> Result<bool, StorageError>;

    /// Create a cursor over all key-value pairs in a keyspace.
    ///
    /// The cursor starts unpositioned and must be advanced with
    /// [`Cursor::next`] or positioned with [`Cursor::seek`].
    fn cursor(&self, keyspace: &str) -> Result<Self::Cursor<'_>, StorageError>;

    /// Create a cursor over a range of keys in a keyspace.
    ///
    /// ```ignore
    /// use std::ops::Bound;
    ///
    /// let cursor = tx.range(
    ///     "my_table",
    ///     Bound::Included(b"a".as_slice()),
    ///     Bound::Excluded(b"z".as_slice()),
    /// )?;
    /// ```
    fn range(
        &self,
        keyspace: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError>;

    /// The lowest entry of a key range, or `None` if the range is empty.
    ///
    /// Backends should override this when opening a cursor reads ahead.
    fn first_entry(&self, keyspace: &str, start: Bound<&[u8]>, end: Bound<&[u8]>) -> CursorResult {
        self.range(keyspace, start, end)?.next()
    }

    /// Create an empty keyspace with the given configuration string.
    ///
    /// Creating a keyspace that already exists with the same configuration
    /// succeeds without effect.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidConfig`] if the backend rejects `config`
    /// - [`StorageError::KeyspaceExists`] if it exists with another configuration
    fn create_keyspace(&mut self, keyspace: &str, config: &str) -> Result<(), StorageError>;

    /// The configuration string a keyspace was created with, or `None` if
    /// it does not exist.
    fn keyspace_config(&self, keyspace: &str) -> Result<Option<String>, StorageError>;

    /// Approximate statistics for a keyspace.
    ///
    /// Returns `Ok(None)` when the backend cannot supply them.
    fn keyspace_stats(&self, _keyspace: &str) -> Result<Option<KeyspaceStats>, StorageError> {
        Ok(None)
    }

    /// Pull a keyspace's data into the backend's cache.
    ///
    /// Returns `Ok(false)` when the backend has no such facility.
    fn prefetch(&self, _keyspace: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    /// Commit the transaction, making all changes durable.
    fn commit(self) -> Result<(), StorageError>;

    /// Rollback the transaction, discarding all changes.
    fn rollback(self) -> Result<(), StorageError>;

    /// Check if this is a read-only transaction.
    fn is_read_only(&self) -> bool;
}

/// A cursor for ordered iteration over key-value pairs.
///
/// ```ignore
/// let mut cursor = tx.cursor("my_table")?;
///
/// cursor.seek(b"prefix")?;
/// while let Some((key, value)) = cursor.next()? {
///     // ...
/// }
/// ```
pub trait Cursor {
    /// Seek to the first key greater than or equal to the given key.
    ///
    /// Returns `None` if no such key exists.
    fn seek(&mut self, key: &[u8]) -> CursorResult;

    /// Seek to the first key-value pair.
    fn seek_first(&mut self) -> CursorResult;

    /// Seek to the last key-value pair.
    fn seek_last(&mut self) -> CursorResult;

    /// Move to the next key-value pair.
    ///
    /// On an unpositioned cursor this is [`seek_first`](Self::seek_first).
    fn next(&mut self) -> CursorResult;

    /// Move to the previous key-value pair.
    ///
    /// On an unpositioned cursor this is [`seek_last`](Self::seek_last).
    fn prev(&mut self) -> CursorResult;

    /// Get the current key-value pair without advancing.
    fn current(&self) -> Option<(&[u8], &[u8])>;
}

/// Implement `StorageEngine` for `Arc<E>` so engines can be shared.
impl<E: StorageEngine> StorageEngine for Arc<E> {
    type Transaction<'a>
        = E::Transaction<'a>
    where
        Self: 'a;

    type Session = E::Session;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_read()
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_write()
    }

    fn open_session(&self) -> Result<Self::Session, StorageError> {
        (**self).open_session()
    }

    fn flush(&self) -> Result<(), StorageError> {
        (**self).flush()
    }
}
