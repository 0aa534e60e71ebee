//! Sort-order preserving encoding for single field values.
//!
//! Comparing two encoded values bytewise gives the same result as comparing
//! the values themselves. Every encoding is self-delimiting, so encodings can
//! be concatenated into composite keys and a whole component can be inverted
//! to reverse its order.
//!
//! # Type Ordering
//!
//! Different types are ordered by their type tag:
//! - `Null` (0x00) - sorts first
//! - `Bool` (0x01) - false before true
//! - `Int` (0x02) - negative to positive
//! - `Float` (0x03) - negative to positive, NaN last
//! - `String` (0x04) - lexicographic UTF-8 order
//! - `Bytes` (0x05) - lexicographic byte order
//!
//! Arrays are rejected because they have no total ordering.
//!
//! # Numbers
//!
//! Integers flip the sign bit and are stored big-endian. Floats flip the sign
//! bit when positive and all bits when negative, which orders `-0.0` before
//! `0.0`; NaN is pinned to the maximum encoding.
//!
//! # Strings and Bytes
//!
//! Null-escaped with a double-null terminator: `0x00` in the data becomes
//! `0x00 0x01` and the sequence ends with `0x00 0x00`. This keeps
//! `"a" < "aa" < "ab" < "b"`.
//!
//! # Direction Mask
//!
//! Every function here takes a byte mask that is XOR-ed into each output byte
//! (and out of each input byte when decoding). A mask of `0x00` gives the
//! ascending form, `0xFF` the descending form.
//!
//! # Example
//!
//! ```
//! use ordix_core::encoding::sortable::{decode_sortable, encode_sortable};
//! use ordix_core::Value;
//!
//! let values = vec![Value::Int(-10), Value::Int(0), Value::Int(10)];
//!
//! let mut encoded: Vec<_> = values.iter().map(|v| encode_sortable(v).unwrap()).collect();
//! encoded.sort();
//!
//! let decoded: Vec<_> = encoded.iter().map(|e| decode_sortable(e).unwrap()).collect();
//! assert_eq!(decoded, values);
//! ```

use crate::error::CoreError;
use crate::types::Value;

/// Type tags for sortable encoding.
///
/// These tags define the sort order of different types.
pub mod tags {
    /// Null values sort first.
    pub const NULL: u8 = 0x00;
    /// Boolean values (false=0x00, true=0x01).
    pub const BOOL: u8 = 0x01;
    /// 64-bit signed integers.
    pub const INT: u8 = 0x02;
    /// 64-bit floating point numbers.
    pub const FLOAT: u8 = 0x03;
    /// UTF-8 strings.
    pub const STRING: u8 = 0x04;
    /// Raw bytes.
    pub const BYTES: u8 = 0x05;
}

const SIGN_FLIP_I64: u64 = 0x8000_0000_0000_0000;

/// Escape byte: 0x00 in data is written as 0x00 0x01
const ESCAPE_BYTE: u8 = 0x01;
/// Terminator: end of string/bytes is 0x00 0x00
const TERMINATOR: u8 = 0x00;

fn push_masked(buf: &mut Vec<u8>, bytes: &[u8], mask: u8) {
    buf.extend(bytes.iter().map(|b| b ^ mask));
}

fn encode_bytes_escaped(data: &[u8], mask: u8, buf: &mut Vec<u8>) {
    for &byte in data {
        if byte == 0x00 {
            buf.push(mask);
            buf.push(ESCAPE_BYTE ^ mask);
        } else {
            buf.push(byte ^ mask);
        }
    }
    buf.push(TERMINATOR ^ mask);
    buf.push(TERMINATOR ^ mask);
}

/// Returns the unescaped bytes and the number of input bytes consumed.
fn decode_bytes_escaped(data: &[u8], mask: u8) -> Result<(Vec<u8>, usize), CoreError> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let byte = data[i] ^ mask;
        if byte == 0x00 {
            let Some(next) = data.get(i + 1) else {
                return Err(CoreError::Encoding("unexpected end of escaped bytes".into()));
            };
            match next ^ mask {
                TERMINATOR => return Ok((result, i + 2)),
                ESCAPE_BYTE => {
                    result.push(0x00);
                    i += 2;
                }
                other => {
                    return Err(CoreError::Encoding(format!(
                        "invalid escape sequence: 0x00 0x{other:02x}"
                    )));
                }
            }
        } else {
            result.push(byte);
            i += 1;
        }
    }

    Err(CoreError::Encoding("missing terminator in escaped bytes".into()))
}

fn read_u64(rest: &[u8], mask: u8, what: &str) -> Result<u64, CoreError> {
    let Some(raw) = rest.get(..8) else {
        return Err(CoreError::Encoding(format!("unexpected end of input reading {what}")));
    };
    let mut arr = [0u8; 8];
    for (dst, src) in arr.iter_mut().zip(raw) {
        *dst = src ^ mask;
    }
    Ok(u64::from_be_bytes(arr))
}

/// Append the sortable encoding of `value` to `buf`, XOR-ing every byte with `mask`.
///
/// # Errors
///
/// Returns [`CoreError::Unindexable`] for arrays. Nothing is written in that case.
pub fn encode_sortable_into(value: &Value, mask: u8, buf: &mut Vec<u8>) -> Result<(), CoreError> {
    match value {
        Value::Null => buf.push(tags::NULL ^ mask),

        Value::Bool(b) => push_masked(buf, &[tags::BOOL, u8::from(*b)], mask),

        Value::Int(i) => {
            buf.push(tags::INT ^ mask);
            #[allow(clippy::cast_sign_loss)]
            let encoded = (*i as u64) ^ SIGN_FLIP_I64;
            push_masked(buf, &encoded.to_be_bytes(), mask);
        }

        Value::Float(f) => {
            buf.push(tags::FLOAT ^ mask);
            let bits = f.to_bits();
            let encoded = if f.is_nan() {
                u64::MAX
            } else if bits & SIGN_FLIP_I64 == 0 {
                bits ^ SIGN_FLIP_I64
            } else {
                !bits
            };
            push_masked(buf, &encoded.to_be_bytes(), mask);
        }

        Value::String(s) => {
            buf.reserve(1 + s.len() + 2);
            buf.push(tags::STRING ^ mask);
            encode_bytes_escaped(s.as_bytes(), mask, buf);
        }

        Value::Bytes(b) => {
            buf.reserve(1 + b.len() + 2);
            buf.push(tags::BYTES ^ mask);
            encode_bytes_escaped(b, mask, buf);
        }

        Value::Array(_) => return Err(CoreError::unindexable(value.type_name(), value)),
    }
    Ok(())
}

/// Encode a value in ascending sortable form.
///
/// # Example
///
/// ```
/// use ordix_core::encoding::sortable::encode_sortable;
/// use ordix_core::Value;
///
/// let neg = encode_sortable(&Value::Int(-5)).unwrap();
/// let pos = encode_sortable(&Value::Int(5)).unwrap();
/// assert!(neg < pos);
/// ```
pub fn encode_sortable(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::with_capacity(sortable_encoded_size(value).unwrap_or(0));
    encode_sortable_into(value, 0x00, &mut buf)?;
    Ok(buf)
}

/// Decode an ascending sortable value that spans the whole input.
pub fn decode_sortable(bytes: &[u8]) -> Result<Value, CoreError> {
    let (value, consumed) = decode_sortable_with_len(bytes, 0x00)?;
    if consumed != bytes.len() {
        return Err(CoreError::Encoding(format!(
            "{} trailing bytes after sortable value",
            bytes.len() - consumed
        )));
    }
    Ok(value)
}

/// Decode one value written with `mask` and return the number of bytes consumed.
///
/// Used for walking composite keys component by component.
pub fn decode_sortable_with_len(bytes: &[u8], mask: u8) -> Result<(Value, usize), CoreError> {
    let Some(&first) = bytes.first() else {
        return Err(CoreError::Encoding("unexpected end of input in sortable decode".into()));
    };

    let tag = first ^ mask;
    let rest = &bytes[1..];

    match tag {
        tags::NULL => Ok((Value::Null, 1)),

        tags::BOOL => match rest.first() {
            Some(b) => Ok((Value::Bool((b ^ mask) != 0), 2)),
            None => Err(CoreError::Encoding("unexpected end of input reading bool".into())),
        },

        tags::INT => {
            let encoded = read_u64(rest, mask, "int")?;
            #[allow(clippy::cast_possible_wrap)]
            let value = (encoded ^ SIGN_FLIP_I64) as i64;
            Ok((Value::Int(value), 9))
        }

        tags::FLOAT => {
            let encoded = read_u64(rest, mask, "float")?;
            let bits = if encoded == u64::MAX {
                f64::NAN.to_bits()
            } else if encoded & SIGN_FLIP_I64 != 0 {
                encoded ^ SIGN_FLIP_I64
            } else {
                !encoded
            };
            Ok((Value::Float(f64::from_bits(bits)), 9))
        }

        tags::STRING => {
            let (decoded, consumed) = decode_bytes_escaped(rest, mask)?;
            let s = String::from_utf8(decoded)
                .map_err(|e| CoreError::Encoding(format!("invalid UTF-8: {e}")))?;
            Ok((Value::String(s), 1 + consumed))
        }

        tags::BYTES => {
            let (decoded, consumed) = decode_bytes_escaped(rest, mask)?;
            Ok((Value::Bytes(decoded), 1 + consumed))
        }

        _ => Err(CoreError::Encoding(format!("unknown sortable type tag: {tag:#x}"))),
    }
}

/// Minimum encoded size of a value, for buffer pre-allocation.
///
/// Strings and bytes grow by one byte per embedded null. Returns `None` for
/// unindexable values.
#[must_use]
pub fn sortable_encoded_size(value: &Value) -> Option<usize> {
    match value {
        Value::Null => Some(1),
        Value::Bool(_) => Some(2),
        Value::Int(_) | Value::Float(_) => Some(9),
        Value::String(s) => Some(1 + s.len() + 2),
        Value::Bytes(b) => Some(1 + b.len() + 2),
        Value::Array(_) => None,
    }
}
