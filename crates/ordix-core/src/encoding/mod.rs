//! Order-preserving key encoding.
//!
//! - [`sortable`] - encoding of single field values with a direction mask
//! - [`KeyCoder`] - composite keys over a per-field direction list
//!
//! Encoded keys compare bytewise in the same order as the original tuples
//! compare under the key pattern's directions.

mod key_coder;
pub mod sortable;

#[cfg(test)]
mod proptest_tests;

pub use key_coder::{increment_prefix, KeyCoder, KEY_FORMAT_VERSION};
