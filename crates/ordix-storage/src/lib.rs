//! Ordix Storage
//!
//! The ordered key/value engine contract that the Ordix index adapter is
//! layered on, plus a redb backend.
//!
//! # Core Traits
//!
//! - [`StorageEngine`] - The main entry point for storage operations
//! - [`Transaction`] - ACID transaction support with read/write operations
//! - [`Cursor`] - Ordered iteration over key-value pairs
//! - [`Session`] - A per-thread engine handle
//!
//! # Error Handling
//!
//! All storage operations return [`StorageResult<T>`], an alias for
//! `Result<T, StorageError>`.
//!
//! # Example
//!
//! ```ignore
//! use ordix_storage::{StorageEngine, Transaction};
//! use ordix_storage::backends::RedbEngine;
//!
//! let engine = RedbEngine::open("indexes.redb")?;
//!
//! let mut tx = engine.begin_write()?;
//! tx.create_keyspace("users", "")?;
//! tx.put("users", b"user:1", b"Alice")?;
//! tx.commit()?;
//!
//! let tx = engine.begin_read()?;
//! assert_eq!(tx.get("users", b"user:1")?, Some(b"Alice".to_vec()));
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Storage engine traits and the configuration grammar
//! - [`backends`] - Concrete storage backend implementations

#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod engine;

pub use engine::{
    Cursor, CursorResult, KeyValue, KeyspaceStats, Session, SessionId, StorageEngine,
    StorageError, StorageResult, Transaction,
};
