//! Error types for the core crate.

use thiserror::Error;

/// Maximum length for value display in error messages.
const MAX_VALUE_DISPLAY_LEN: usize = 100;

/// Errors that can occur in the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An encoding or decoding error occurred.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A key tuple did not match the shape of the key pattern.
    #[error("key has {actual} fields, key pattern has {expected}")]
    KeyShape {
        /// Number of fields in the key pattern.
        expected: usize,
        /// Number of fields supplied.
        actual: usize,
    },

    /// A value type cannot take part in an ordered key.
    #[error("type {actual} cannot be indexed{}", value.as_ref().map(|v| format!(" (value: {v})")).unwrap_or_default())]
    Unindexable {
        /// The offending type name.
        actual: String,
        /// The value that was rejected (truncated for display).
        value: Option<String>,
    },
}

impl CoreError {
    /// Creates an unindexable-type error carrying the value for debugging.
    ///
    /// The value is truncated to 100 characters for display.
    #[must_use]
    pub fn unindexable(actual: impl Into<String>, value: impl std::fmt::Display) -> Self {
        let value_str = value.to_string();
        let truncated = if value_str.len() > MAX_VALUE_DISPLAY_LEN {
            let mut end = MAX_VALUE_DISPLAY_LEN;
            while !value_str.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &value_str[..end])
        } else {
            value_str
        };
        Self::Unindexable { actual: actual.into(), value: Some(truncated) }
    }
}
