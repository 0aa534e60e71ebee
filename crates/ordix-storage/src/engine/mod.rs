//! Storage engine traits and abstractions.
//!
//! - [`StorageEngine`] - entry point for transactions and sessions
//! - [`Transaction`] - get/put/delete/range plus keyspace management
//! - [`Cursor`] - ordered iteration over key-value pairs
//! - [`Session`] - a per-thread handle leased from the engine
//!
//! Keyspace configuration strings follow the grammar in [`config`].

pub mod config;
mod error;
mod traits;

pub use config::{parse_config, parse_size, strip_group, ConfigItem};
pub use error::{StorageError, StorageResult};
pub use traits::{
    Cursor, CursorResult, KeyValue, KeyspaceStats, Session, SessionId, StorageEngine, Transaction,
};
