//! Redb table definitions and key encoding utilities.
//!
//! Redb requires static table names, so logical keyspaces are stored in one
//! physical table with the keyspace name as a key prefix.

use redb::TableDefinition;

use crate::engine::StorageError;

/// The physical table that stores all key-value pairs.
/// Logical keyspace names are prefixed to keys.
pub const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("ordix_data");

/// Separator byte between keyspace name and key in the encoded key.
pub const KEY_SEPARATOR: u8 = 0x00;

/// Prefix reserved for keyspaces owned by the backend itself.
pub const RESERVED_PREFIX: &str = "__";

/// Encode a logical keyspace name and key into a physical key.
///
/// The format is: `<keyspace><separator><key>`
pub fn encode_key(keyspace: &str, key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(keyspace.len() + 1 + key.len());
    encoded.extend_from_slice(keyspace.as_bytes());
    encoded.push(KEY_SEPARATOR);
    encoded.extend_from_slice(key);
    encoded
}

/// Decode a physical key into its logical keyspace name and original key.
///
/// Returns `None` if the key is malformed (missing separator).
pub fn decode_key(encoded: &[u8]) -> Option<(&str, &[u8])> {
    let sep_pos = encoded.iter().position(|&b| b == KEY_SEPARATOR)?;
    let keyspace = std::str::from_utf8(&encoded[..sep_pos]).ok()?;
    Some((keyspace, &encoded[sep_pos + 1..]))
}

/// The first physical key of a keyspace.
pub fn keyspace_start_key(keyspace: &str) -> Vec<u8> {
    encode_key(keyspace, &[])
}

/// The first physical key that does NOT belong to the keyspace.
pub fn keyspace_end_key(keyspace: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(keyspace.len() + 1);
    key.extend_from_slice(keyspace.as_bytes());
    key.push(KEY_SEPARATOR + 1);
    key
}

/// Check that a name can be used for a user keyspace.
///
/// Names must be non-empty, must not contain the separator byte, and must
/// not start with [`RESERVED_PREFIX`].
pub fn validate_name(keyspace: &str) -> Result<(), StorageError> {
    if keyspace.is_empty()
        || keyspace.as_bytes().contains(&KEY_SEPARATOR)
        || keyspace.starts_with(RESERVED_PREFIX)
    {
        return Err(StorageError::InvalidName(keyspace.to_owned()));
    }
    Ok(())
}

/// Backend-owned keyspace names.
pub mod names {
    /// Registry of created keyspaces (name -> configuration string).
    pub const KEYSPACES: &str = "__keyspaces";
}
