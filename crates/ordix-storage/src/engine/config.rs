//! Keyspace configuration string grammar.
//!
//! A configuration string is a comma-separated list of `key=value` items:
//!
//! ```text
//! type=file,leaf_page_max=16k,app_metadata=(formatVersion=1,infoObj={"a":1})
//! ```
//!
//! - Values may be groups delimited by `()`, `[]` or `{}` and may contain
//!   double-quoted strings; commas inside a group or string do not split.
//! - A bare key is shorthand for `key=true`.
//! - Empty items are ignored, so `a=1,,b=2,` is valid.
//! - Items are returned in order; later items override earlier ones.

use super::{StorageError, StorageResult};

/// One `key=value` item of a configuration string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    /// The item key.
    pub key: String,
    /// The raw value, groups and quotes included.
    pub value: String,
}

fn invalid(config: &str, reason: impl std::fmt::Display) -> StorageError {
    StorageError::InvalidConfig(format!("{reason} in {config:?}"))
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Split a configuration string into items.
///
/// # Errors
///
/// Returns [`StorageError::InvalidConfig`] for unbalanced groups,
/// unterminated strings, empty keys or keys with illegal characters.
pub fn parse_config(config: &str) -> StorageResult<Vec<ConfigItem>> {
    let mut items = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in config.char_indices() {
        if in_quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '"' => in_quote = true,
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(c) {
                    return Err(invalid(config, format!("unbalanced '{c}' at offset {i}")));
                }
            }
            ',' if stack.is_empty() => {
                push_item(config, &config[start..i], &mut items)?;
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quote {
        return Err(invalid(config, "unterminated string"));
    }
    if let Some(close) = stack.last() {
        return Err(invalid(config, format!("missing '{close}'")));
    }
    push_item(config, &config[start..], &mut items)?;
    Ok(items)
}

fn push_item(config: &str, raw: &str, items: &mut Vec<ConfigItem>) -> StorageResult<()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(());
    }

    let (key, value) = match raw.split_once('=') {
        Some((k, v)) => (k.trim(), v.trim()),
        None => (raw, "true"),
    };

    if key.is_empty() {
        return Err(invalid(config, format!("empty key in item {raw:?}")));
    }
    if !key.chars().all(is_key_char) {
        return Err(invalid(config, format!("illegal key {key:?}")));
    }

    items.push(ConfigItem { key: key.to_owned(), value: value.to_owned() });
    Ok(())
}

/// The inside of a parenthesized group, or `None` if `value` is not one.
#[must_use]
pub fn strip_group(value: &str) -> Option<&str> {
    value.strip_prefix('(')?.strip_suffix(')')
}

/// Parse a byte size with an optional `k`, `m` or `g` suffix (powers of 1024).
///
/// Returns `None` when the value is not a size.
#[must_use]
pub fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim();
    let (digits, shift) = match value.chars().last()? {
        'k' | 'K' => (&value[..value.len() - 1], 10),
        'm' | 'M' => (&value[..value.len() - 1], 20),
        'g' | 'G' => (&value[..value.len() - 1], 30),
        _ => (value, 0),
    };
    let n: u64 = digits.parse().ok()?;
    n.checked_mul(1u64 << shift)
}
