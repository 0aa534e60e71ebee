//! Identifiers for the records an index entry points to.

use serde::{Deserialize, Serialize};

/// Identifier of the document a secondary-index entry refers to.
///
/// Record ids are stored big-endian so that their byte order matches their
/// numeric order, which keeps entries sharing one key sorted by record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Size of an encoded record id in bytes.
    pub const ENCODED_LEN: usize = 8;

    /// Create a new `RecordId` from a raw u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Big-endian byte form.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        self.0.to_be_bytes()
    }

    /// Parse a record id from exactly eight big-endian bytes.
    ///
    /// Returns `None` if the slice has the wrong length.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; Self::ENCODED_LEN] = bytes.try_into().ok()?;
        Some(Self(u64::from_be_bytes(arr)))
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}
