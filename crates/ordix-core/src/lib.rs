//! Ordix Core
//!
//! Key types and the order-preserving key encoding shared by the Ordix
//! storage layer and index adapter.
//!
//! - [`Value`] - a field value taken from a document
//! - [`RecordId`] - the document an index entry points to
//! - [`Direction`] - ascending/descending order of one key field
//! - [`encoding::KeyCoder`] - composite key encoder honoring directions
//!
//! # Example
//!
//! ```
//! use ordix_core::encoding::KeyCoder;
//! use ordix_core::{Direction, Value};
//!
//! let coder = KeyCoder::new(vec![Direction::Descending]);
//! let mut keys: Vec<_> = [1i64, 3, 2]
//!     .iter()
//!     .map(|i| coder.encode(&[Value::Int(*i)]).unwrap())
//!     .collect();
//! keys.sort();
//!
//! assert_eq!(coder.decode(&keys[0]).unwrap(), vec![Value::Int(3)]);
//! ```

#![deny(clippy::unwrap_used)]

pub mod encoding;
pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{Direction, RecordId, Value};
