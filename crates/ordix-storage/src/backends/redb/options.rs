//! Semantic validation of keyspace configuration strings.
//!
//! [`parse_config`](crate::engine::parse_config) only checks the grammar. The
//! redb backend additionally requires every key to be one it knows and every
//! value to be in range before a keyspace is created.

use crate::engine::{parse_config, parse_size, strip_group, StorageError, StorageResult};

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: u64 = 512;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u64 = 512 * 1024 * 1024;

/// Page checksum mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Checksum {
    /// Checksum every page.
    #[default]
    On,
    /// Never checksum.
    Off,
    /// Checksum only pages that are not compressed.
    Uncompressed,
}

/// Block compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockCompressor {
    /// No compression.
    #[default]
    None,
    /// Snappy.
    Snappy,
    /// Zlib.
    Zlib,
    /// Zstandard.
    Zstd,
}

/// The validated contents of a keyspace configuration string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceOptions {
    /// Maximum internal page size in bytes.
    pub internal_page_max: u64,
    /// Maximum leaf page size in bytes.
    pub leaf_page_max: u64,
    /// Page checksum mode.
    pub checksum: Checksum,
    /// Whether key prefixes are compressed.
    pub prefix_compression: bool,
    /// Block compressor.
    pub block_compressor: BlockCompressor,
    /// Contents of the `app_metadata` group, if any.
    pub app_metadata: Option<String>,
}

impl Default for KeyspaceOptions {
    fn default() -> Self {
        Self {
            internal_page_max: 4 * 1024,
            leaf_page_max: 32 * 1024,
            checksum: Checksum::On,
            prefix_compression: false,
            block_compressor: BlockCompressor::None,
            app_metadata: None,
        }
    }
}

fn reject(key: &str, value: &str) -> StorageError {
    StorageError::InvalidConfig(format!("invalid value for {key}: {value:?}"))
}

fn parse_bool(key: &str, value: &str) -> StorageResult<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(reject(key, value)),
    }
}

fn parse_page_size(key: &str, value: &str) -> StorageResult<u64> {
    match parse_size(value) {
        Some(n) if (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
        _ => Err(reject(key, value)),
    }
}

impl KeyspaceOptions {
    /// Parse and validate a configuration string.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if the string is malformed,
    /// names an unknown key, or carries a value out of range.
    pub fn parse(config: &str) -> StorageResult<Self> {
        let mut options = Self::default();

        for item in parse_config(config)? {
            let value = item.value.as_str();
            match item.key.as_str() {
                "type" => {
                    if !matches!(value, "file" | "btree") {
                        return Err(reject(&item.key, value));
                    }
                }
                "key_format" | "value_format" => {
                    if value != "u" {
                        return Err(reject(&item.key, value));
                    }
                }
                "internal_page_max" => {
                    options.internal_page_max = parse_page_size(&item.key, value)?;
                }
                "leaf_page_max" => options.leaf_page_max = parse_page_size(&item.key, value)?,
                "checksum" => {
                    options.checksum = match value {
                        "on" => Checksum::On,
                        "off" => Checksum::Off,
                        "uncompressed" => Checksum::Uncompressed,
                        _ => return Err(reject(&item.key, value)),
                    };
                }
                "prefix_compression" => {
                    options.prefix_compression = parse_bool(&item.key, value)?;
                }
                "block_compressor" => {
                    options.block_compressor = match value {
                        "" | "none" => BlockCompressor::None,
                        "snappy" => BlockCompressor::Snappy,
                        "zlib" => BlockCompressor::Zlib,
                        "zstd" => BlockCompressor::Zstd,
                        _ => return Err(reject(&item.key, value)),
                    };
                }
                "app_metadata" => {
                    let inner = if value.is_empty() {
                        ""
                    } else {
                        strip_group(value).ok_or_else(|| reject(&item.key, value))?
                    };
                    options.app_metadata = Some(inner.to_owned());
                }
                other => {
                    return Err(StorageError::InvalidConfig(format!(
                        "unknown configuration key: {other}"
                    )));
                }
            }
        }

        Ok(options)
    }
}
