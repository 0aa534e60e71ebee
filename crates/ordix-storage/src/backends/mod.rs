//! Storage backend implementations.
//!
//! - [`redb`] - pure-Rust embedded database (default)

pub mod redb;

pub use self::redb::{RedbConfig, RedbEngine};
