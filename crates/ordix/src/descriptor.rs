//! Index declarations.
//!
//! An [`IndexDescriptor`] is the catalog's description of one secondary
//! index. It is fixed for the lifetime of a [`SortedIndex`](crate::SortedIndex)
//! and is embedded, as JSON, in the keyspace metadata.

use ordix_core::encoding::KeyCoder;
use ordix_core::Direction;
use serde::{Deserialize, Serialize};

/// One field of a key pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyField {
    /// Document field path.
    pub field: String,
    /// Sort direction of this field.
    #[serde(default)]
    pub direction: Direction,
}

/// The declaration of one secondary index.
///
/// # Example
///
/// ```
/// use ordix::IndexDescriptor;
/// use ordix_core::Direction;
///
/// let descriptor = IndexDescriptor::new(1, "email_1", "users")
///     .with_field("email", Direction::Ascending)
///     .with_unique(true);
///
/// assert_eq!(descriptor.uri(), "index:users:email_1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    /// Stable numeric identifier.
    pub id: u64,
    /// Index name, unique within the collection.
    pub name: String,
    /// Owning collection.
    pub collection: String,
    /// Fields of the composite key, in order.
    pub key_pattern: Vec<KeyField>,
    /// Whether a key may be bound to at most one record.
    #[serde(default)]
    pub unique: bool,
    /// Per-engine options, e.g. `{"redb": {"configString": "..."}}`.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub storage_engine: serde_json::Value,
}

impl IndexDescriptor {
    /// Create a descriptor with an empty key pattern.
    pub fn new(id: u64, name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            collection: collection.into(),
            key_pattern: Vec::new(),
            unique: false,
            storage_engine: serde_json::Value::Null,
        }
    }

    /// Append a field to the key pattern.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.key_pattern.push(KeyField { field: field.into(), direction });
        self
    }

    /// Set the uniqueness flag.
    #[must_use]
    pub const fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set the per-engine options object.
    #[must_use]
    pub fn with_storage_engine(mut self, options: serde_json::Value) -> Self {
        self.storage_engine = options;
        self
    }

    /// The keyspace URI that stores this index.
    pub fn uri(&self) -> String {
        format!("index:{}:{}", self.collection, self.name)
    }

    /// Per-field directions of the key pattern.
    pub fn ordering(&self) -> Vec<Direction> {
        self.key_pattern.iter().map(|f| f.direction).collect()
    }

    /// A key coder for this key pattern.
    pub fn key_coder(&self) -> KeyCoder {
        KeyCoder::new(self.ordering())
    }

    /// How this descriptor disagrees with `stored` on the layout of the
    /// keyspace, if at all. Only the key pattern and uniqueness count.
    pub fn layout_mismatch(&self, stored: &Self) -> Option<String> {
        if self.unique != stored.unique {
            return Some(format!("unique is {}, stored as {}", self.unique, stored.unique));
        }
        if self.key_pattern != stored.key_pattern {
            return Some(format!(
                "key pattern {} differs from stored {}",
                render_pattern(&self.key_pattern),
                render_pattern(&stored.key_pattern)
            ));
        }
        None
    }
}

/// Render a key pattern as `{ x: 1, y: -1 }`.
fn render_pattern(pattern: &[KeyField]) -> String {
    let fields: Vec<String> = pattern
        .iter()
        .map(|f| {
            let n = match f.direction {
                Direction::Ascending => 1,
                Direction::Descending => -1,
            };
            format!("{}: {n}", f.field)
        })
        .collect();
    format!("{{ {} }}", fields.join(", "))
}
