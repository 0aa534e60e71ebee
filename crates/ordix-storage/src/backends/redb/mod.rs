//! Redb storage backend.
//!
//! Redb is a pure-Rust embedded database with ACID transactions. Every
//! keyspace lives in a single physical redb table; keys are prefixed with
//! the keyspace name (see [`tables`]).
//!
//! # Example
//!
//! ```ignore
//! use ordix_storage::backends::RedbEngine;
//! use ordix_storage::{StorageEngine, Transaction};
//!
//! let engine = RedbEngine::open("indexes.redb")?;
//!
//! let mut tx = engine.begin_write()?;
//! tx.create_keyspace("index:users:by_email", "type=file,key_format=u,value_format=u")?;
//! tx.put("index:users:by_email", b"alice@example.com", &7u64.to_be_bytes())?;
//! tx.commit()?;
//! ```
//!
//! # Configuration
//!
//! ```ignore
//! use ordix_storage::backends::redb::{RedbConfig, RedbEngine};
//!
//! let config = RedbConfig::new()
//!     .cache_size(64 * 1024 * 1024)
//!     .max_sessions(32);
//!
//! let engine = RedbEngine::open_with_config("indexes.redb", config)?;
//! ```

mod engine;
pub mod options;
mod session;
pub mod tables;
mod transaction;

pub use engine::{RedbConfig, RedbEngine};
pub use options::{BlockCompressor, Checksum, KeyspaceOptions};
pub use session::RedbSession;
pub use transaction::{RedbCursor, RedbTransaction};
