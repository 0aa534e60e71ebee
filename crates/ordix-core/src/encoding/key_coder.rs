//! Composite key encoding honoring per-field sort direction.
//!
//! A composite key is encoded as the concatenation of its components'
//! [sortable](super::sortable) encodings. Descending components are written
//! with every byte inverted. Because each component encoding is
//! self-delimiting, no complete key encoding is a prefix of another, and
//! inverting a component exactly reverses its order.
//!
//! ```text
//! [field 0 (mask d0)][field 1 (mask d1)]...[field n-1 (mask dn-1)]
//! ```
//!
//! The encoding is persisted by the engine, so any change to it must bump
//! [`KEY_FORMAT_VERSION`].

use std::cmp::Ordering;
use std::sync::Arc;

use crate::encoding::sortable::{decode_sortable_with_len, encode_sortable_into, sortable_encoded_size};
use crate::error::CoreError;
use crate::types::{Direction, Value};

/// Version of the composite key byte format.
pub const KEY_FORMAT_VERSION: u32 = 1;

/// Encoder/decoder for the composite keys of one key pattern.
///
/// The coder is a pure function of its direction list: cloning is cheap and
/// every clone produces identical bytes.
///
/// # Example
///
/// ```
/// use ordix_core::encoding::KeyCoder;
/// use ordix_core::{Direction, Value};
///
/// let coder = KeyCoder::new(vec![Direction::Ascending, Direction::Descending]);
///
/// let a = coder.encode(&[Value::Int(1), Value::Int(9)]).unwrap();
/// let b = coder.encode(&[Value::Int(1), Value::Int(2)]).unwrap();
///
/// // The second field is descending, so 9 sorts before 2.
/// assert!(a < b);
/// assert_eq!(coder.decode(&a).unwrap(), vec![Value::Int(1), Value::Int(9)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCoder {
    directions: Arc<[Direction]>,
}

impl KeyCoder {
    /// Create a coder for the given per-field directions.
    #[must_use]
    pub fn new(directions: impl Into<Arc<[Direction]>>) -> Self {
        Self { directions: directions.into() }
    }

    /// The per-field directions.
    #[must_use]
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Number of fields in a key.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.directions.len()
    }

    /// Encode a key into a fresh buffer.
    pub fn encode(&self, key: &[Value]) -> Result<Vec<u8>, CoreError> {
        let capacity = key.iter().filter_map(sortable_encoded_size).sum();
        let mut buf = Vec::with_capacity(capacity);
        self.encode_into(key, &mut buf)?;
        Ok(buf)
    }

    /// Append the encoding of `key` to `buf`.
    ///
    /// On error `buf` is left as it was on entry.
    pub fn encode_into(&self, key: &[Value], buf: &mut Vec<u8>) -> Result<(), CoreError> {
        if key.len() != self.directions.len() {
            return Err(CoreError::KeyShape { expected: self.directions.len(), actual: key.len() });
        }

        let start = buf.len();
        for (value, direction) in key.iter().zip(self.directions.iter()) {
            if let Err(e) = encode_sortable_into(value, direction.mask(), buf) {
                buf.truncate(start);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Compare two decoded keys in index order, honoring each field's
    /// direction. Agrees with the byte order of their encodings.
    #[must_use]
    pub fn compare(&self, a: &[Value], b: &[Value]) -> Ordering {
        a.iter()
            .zip(b)
            .zip(self.directions.iter())
            .map(|((x, y), d)| d.apply(x.cmp_sortable(y)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len()))
    }

    /// Decode a key that spans the whole input.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, CoreError> {
        let (key, consumed) = self.decode_prefix(bytes)?;
        if consumed != bytes.len() {
            return Err(CoreError::Encoding(format!(
                "{} trailing bytes after composite key",
                bytes.len() - consumed
            )));
        }
        Ok(key)
    }

    /// Decode a key at the start of `bytes`, returning it with the number of
    /// bytes consumed. Anything after the key is left to the caller.
    pub fn decode_prefix(&self, bytes: &[u8]) -> Result<(Vec<Value>, usize), CoreError> {
        let mut key = Vec::with_capacity(self.directions.len());
        let mut offset = 0;
        for direction in self.directions.iter() {
            let (value, consumed) = decode_sortable_with_len(&bytes[offset..], direction.mask())?;
            key.push(value);
            offset += consumed;
        }
        Ok((key, offset))
    }
}

/// The smallest byte string greater than every string starting with `prefix`.
///
/// Returns `None` when `prefix` is empty or all `0xFF`, in which case no such
/// bound exists and a scan should run to the end of the keyspace.
#[must_use]
pub fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
