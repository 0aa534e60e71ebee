//! Per-field sort direction of a key pattern.

use serde::{Deserialize, Serialize};

/// Sort direction of one component of a composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smaller values first.
    #[default]
    Ascending,
    /// Larger values first.
    Descending,
}

impl Direction {
    /// The byte mask applied to an encoded component in this direction.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::Ascending => 0x00,
            Self::Descending => 0xFF,
        }
    }

    /// Apply this direction to an ascending comparison result.
    #[inline]
    #[must_use]
    pub const fn apply(self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Ascending => ord,
            Self::Descending => ord.reverse(),
        }
    }
}
