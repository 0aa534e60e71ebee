//! Ordix - sorted secondary indexes over an ordered key/value engine.
//!
//! A [`SortedIndex`] maintains an ordered mapping from composite keys,
//! extracted from documents, to record ids. It supports point lookup,
//! directional cursors, bulk construction and duplicate-key enforcement,
//! and stores everything in one keyspace of a [`StorageEngine`].
//!
//! # Overview
//!
//! - [`IndexDescriptor`] - the declaration of an index
//! - [`generate_create_string`] - resolves the keyspace configuration
//! - [`SortedIndex`] - insert, unindex, lookups, validation and stats
//! - [`IndexCursor`] - forward or backward iteration within a transaction
//! - [`BulkBuilder`] - ordered loading for initial builds
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use ordix::{generate_create_string, IndexDescriptor, SortedIndex};
//! use ordix_core::{Direction, RecordId, Value};
//! use ordix_storage::backends::RedbEngine;
//! use ordix_storage::{StorageEngine, Transaction};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(RedbEngine::in_memory()?);
//! let descriptor = IndexDescriptor::new(1, "x_1", "coll")
//!     .with_field("x", Direction::Ascending)
//!     .with_unique(true);
//! let config = generate_create_string(RedbEngine::NAME, "", "", &descriptor)?;
//! let index = SortedIndex::new(Arc::clone(&engine), descriptor, config);
//!
//! let mut tx = engine.begin_write()?;
//! index.init_as_empty(&mut tx)?;
//! index.insert(&mut tx, &[Value::Int(5)], RecordId::new(1), false)?;
//! assert!(index.insert(&mut tx, &[Value::Int(5)], RecordId::new(2), false).is_err());
//! tx.commit()?;
//!
//! let tx = engine.begin_read()?;
//! assert_eq!(index.find_record(&tx, &[Value::Int(5)])?, Some(RecordId::new(1)));
//! # Ok(())
//! # }
//! ```
//!
//! [`StorageEngine`]: ordix_storage::StorageEngine

#![deny(clippy::unwrap_used)]

pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod index;

pub use config::{generate_create_string, parse_index_options};
pub use descriptor::{IndexDescriptor, KeyField};
pub use error::{IndexError, IndexResult};
pub use index::{
    BulkBuilder, CursorDirection, IndexCursor, IndexEntry, IndexState, SortedIndex,
    UniquenessPolicy, ValidateReport,
};
