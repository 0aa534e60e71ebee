//! The sorted index core.
//!
//! A [`SortedIndex`] maps composite keys to record ids inside one engine
//! keyspace. The physical layout depends on the [`UniquenessPolicy`]:
//!
//! | policy | physical key | value |
//! |---|---|---|
//! | `Unique` | encoded key | record id |
//! | `Standard` | encoded key, record id | empty |
//!
//! so a unique index can hold at most one record per key, and a standard
//! index keeps the records of one key sorted by id.
//!
//! Every operation runs inside a transaction supplied by the caller. The
//! index adds no locking of its own beyond its lifecycle state and the
//! bulk-build flag; isolation between transactions is the engine's.

mod bulk;
mod cursor;
mod validate;

use std::fmt::Write as _;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use ordix_core::encoding::{increment_prefix, KeyCoder, KEY_FORMAT_VERSION};
use ordix_core::{Direction, RecordId, Value};
use ordix_storage::{Cursor, StorageEngine, Transaction};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::{format_version, stored_descriptor};
use crate::context::ContextCache;
use crate::descriptor::IndexDescriptor;
use crate::error::{IndexError, IndexResult};

pub use bulk::BulkBuilder;
pub use cursor::{CursorDirection, IndexCursor, IndexEntry};
pub use validate::ValidateReport;

/// How an index treats two records under one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessPolicy {
    /// One record per key.
    Unique,
    /// Any number of records per key.
    Standard,
}

impl UniquenessPolicy {
    /// The policy for a descriptor's `unique` flag.
    #[must_use]
    pub const fn from_unique(unique: bool) -> Self {
        if unique {
            Self::Unique
        } else {
            Self::Standard
        }
    }
}

/// Lifecycle of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Constructed, keyspace not yet created.
    Uninitialized,
    /// Usable.
    Active,
    /// Dropped; every operation fails.
    Dropped,
}

#[derive(Debug, Default)]
struct IndexCounters {
    inserts: AtomicU64,
    removes: AtomicU64,
    duplicate_rejections: AtomicU64,
}

/// A sorted secondary index over an ordered key/value engine.
///
/// # Example
///
/// ```ignore
/// let descriptor = IndexDescriptor::new(1, "x_1", "c")
///     .with_field("x", Direction::Ascending)
///     .with_unique(true);
/// let config = generate_create_string(RedbEngine::NAME, "", "", &descriptor)?;
/// let index = SortedIndex::new(Arc::clone(&engine), descriptor, config);
///
/// let mut tx = engine.begin_write()?;
/// index.init_as_empty(&mut tx)?;
/// index.insert(&mut tx, &[Value::Int(5)], RecordId::new(1), false)?;
/// tx.commit()?;
/// ```
pub struct SortedIndex<E: StorageEngine> {
    descriptor: IndexDescriptor,
    uri: String,
    policy: UniquenessPolicy,
    create_config: String,
    coder: KeyCoder,
    state: RwLock<IndexState>,
    contexts: ContextCache<E>,
    bulk_active: AtomicBool,
    counters: IndexCounters,
}

impl<E: StorageEngine> SortedIndex<E> {
    /// Create an uninitialized index. Call [`init_as_empty`](Self::init_as_empty)
    /// to create its keyspace with `create_config`.
    pub fn new(engine: Arc<E>, descriptor: IndexDescriptor, create_config: impl Into<String>) -> Self {
        Self::with_state(engine, descriptor, create_config.into(), IndexState::Uninitialized)
    }

    /// Attach to an index whose keyspace already exists.
    ///
    /// # Errors
    ///
    /// - [`IndexError::NotInitialized`] if the keyspace does not exist
    /// - [`IndexError::IncompatibleFormat`] if it was written with another
    ///   key format version
    /// - [`IndexError::DescriptorMismatch`] if its stored descriptor has a
    ///   different key pattern or uniqueness than `descriptor`
    pub fn open_existing<T: Transaction>(
        engine: Arc<E>,
        tx: &T,
        descriptor: IndexDescriptor,
    ) -> IndexResult<Self> {
        let uri = descriptor.uri();
        let Some(config) = tx.keyspace_config(&uri)? else {
            return Err(IndexError::NotInitialized { uri });
        };

        if let Some(found) = format_version(&config)? {
            if found != KEY_FORMAT_VERSION {
                return Err(IndexError::IncompatibleFormat {
                    uri,
                    found,
                    expected: KEY_FORMAT_VERSION,
                });
            }
        }

        if let Some(stored) = stored_descriptor(&config)? {
            if let Some(detail) = descriptor.layout_mismatch(&stored) {
                warn!(%uri, %detail, "index declaration does not match its keyspace");
                return Err(IndexError::DescriptorMismatch { uri, detail });
            }
        }

        Ok(Self::with_state(engine, descriptor, config, IndexState::Active))
    }

    fn with_state(
        engine: Arc<E>,
        descriptor: IndexDescriptor,
        create_config: String,
        state: IndexState,
    ) -> Self {
        let uri = descriptor.uri();
        let coder = descriptor.key_coder();
        Self {
            policy: UniquenessPolicy::from_unique(descriptor.unique),
            contexts: ContextCache::new(engine, coder.clone(), uri.clone()),
            coder,
            uri,
            descriptor,
            create_config,
            state: RwLock::new(state),
            bulk_active: AtomicBool::new(false),
            counters: IndexCounters::default(),
        }
    }

    /// The index declaration.
    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Keyspace URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Per-field directions.
    pub fn ordering(&self) -> &[Direction] {
        self.coder.directions()
    }

    /// Duplicate handling policy.
    pub fn policy(&self) -> UniquenessPolicy {
        self.policy
    }

    /// Whether this is a unique index.
    pub fn is_unique(&self) -> bool {
        self.policy == UniquenessPolicy::Unique
    }

    /// The keyspace configuration string.
    pub fn create_config(&self) -> &str {
        &self.create_config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IndexState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: IndexState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Number of thread contexts created for this index.
    pub fn thread_contexts(&self) -> usize {
        self.contexts.len()
    }

    fn check_active(&self) -> IndexResult<()> {
        match self.state() {
            IndexState::Active => Ok(()),
            IndexState::Uninitialized => Err(IndexError::NotInitialized { uri: self.uri.clone() }),
            IndexState::Dropped => Err(IndexError::Dropped { uri: self.uri.clone() }),
        }
    }

    fn check_writable(&self) -> IndexResult<()> {
        self.check_active()?;
        if self.bulk_active.load(Ordering::Acquire) {
            return Err(IndexError::BulkLoadInProgress { index: self.name().to_owned() });
        }
        Ok(())
    }

    /// Create the backing keyspace with no entries.
    ///
    /// Calling this on an active index does nothing.
    ///
    /// # Errors
    ///
    /// [`IndexError::Dropped`] after [`mark_dropped`](Self::mark_dropped), or
    /// [`IndexError::Engine`] if the engine rejects the configuration.
    pub fn init_as_empty<T: Transaction>(&self, tx: &mut T) -> IndexResult<()> {
        match self.state() {
            IndexState::Active => return Ok(()),
            IndexState::Dropped => return Err(IndexError::Dropped { uri: self.uri.clone() }),
            IndexState::Uninitialized => {}
        }

        tx.create_keyspace(&self.uri, &self.create_config)?;
        self.set_state(IndexState::Active);
        info!(index = %self.name(), uri = %self.uri, "initialized empty index");
        Ok(())
    }

    /// Mark the index dropped. Later operations fail with
    /// [`IndexError::Dropped`].
    pub fn mark_dropped(&self) {
        self.set_state(IndexState::Dropped);
        info!(index = %self.name(), "index dropped");
    }

    /// Add an entry.
    ///
    /// On a unique index, a key already bound to another record is rejected
    /// unless `dups_allowed`, in which case the new record replaces it.
    /// Re-inserting an existing entry succeeds without effect.
    ///
    /// # Errors
    ///
    /// [`IndexError::DuplicateKey`] on a rejected duplicate, in which case
    /// nothing was written.
    pub fn insert<T: Transaction>(
        &self,
        tx: &mut T,
        key: &[Value],
        id: RecordId,
        dups_allowed: bool,
    ) -> IndexResult<()> {
        self.check_writable()?;
        let mut ctx = self.contexts.acquire()?;

        match self.policy {
            UniquenessPolicy::Unique => {
                let encoded = ctx.encode(key)?;
                if let Some(existing) = tx.get(&self.uri, encoded)? {
                    if existing == id.to_bytes() {
                        return Ok(());
                    }
                    if !dups_allowed {
                        self.counters.duplicate_rejections.fetch_add(1, Ordering::Relaxed);
                        debug!(index = %self.name(), record = %id, "duplicate key rejected");
                        return Err(self.dup_key_error(key));
                    }
                }
                tx.put(&self.uri, encoded, &id.to_bytes())?;
            }
            UniquenessPolicy::Standard => {
                let physical = ctx.encode_with_id(key, id)?;
                tx.put(&self.uri, physical, &[])?;
            }
        }

        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Remove the entry binding `key` to `id`.
    ///
    /// Removing an absent entry succeeds. On a unique index the entry is only
    /// removed if the key is still bound to `id`.
    pub fn unindex<T: Transaction>(
        &self,
        tx: &mut T,
        key: &[Value],
        id: RecordId,
        dups_allowed: bool,
    ) -> IndexResult<()> {
        self.check_writable()?;
        let mut ctx = self.contexts.acquire()?;

        let removed = match self.policy {
            UniquenessPolicy::Unique => {
                let encoded = ctx.encode(key)?;
                match tx.get(&self.uri, encoded)? {
                    Some(existing) if existing == id.to_bytes() => tx.delete(&self.uri, encoded)?,
                    _ => false,
                }
            }
            UniquenessPolicy::Standard => {
                let physical = ctx.encode_with_id(key, id)?;
                tx.delete(&self.uri, physical)?
            }
        };

        if removed {
            self.counters.removes.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!(index = %self.name(), record = %id, dups_allowed, "unindex of absent entry");
        }
        Ok(())
    }

    /// Fail with [`IndexError::DuplicateKey`] if inserting `key` for `id`
    /// would be rejected. Always succeeds on a standard index.
    pub fn dup_key_check<T: Transaction>(
        &self,
        tx: &T,
        key: &[Value],
        id: RecordId,
    ) -> IndexResult<()> {
        self.check_active()?;
        if self.policy == UniquenessPolicy::Standard {
            return Ok(());
        }

        let mut ctx = self.contexts.acquire()?;
        match tx.get(&self.uri, ctx.encode(key)?)? {
            Some(existing) if existing != id.to_bytes() => Err(self.dup_key_error(key)),
            _ => Ok(()),
        }
    }

    /// Whether the index holds no entries.
    pub fn is_empty<T: Transaction>(&self, tx: &T) -> IndexResult<bool> {
        self.check_active()?;
        Ok(tx.first_entry(&self.uri, Bound::Unbounded, Bound::Unbounded)?.is_none())
    }

    /// The record bound to `key`. For a standard index this is the lowest
    /// record id under the key.
    pub fn find_record<T: Transaction>(
        &self,
        tx: &T,
        key: &[Value],
    ) -> IndexResult<Option<RecordId>> {
        self.check_active()?;
        let mut ctx = self.contexts.acquire()?;
        let encoded = ctx.encode(key)?;

        match self.policy {
            UniquenessPolicy::Unique => match tx.get(&self.uri, encoded)? {
                Some(value) => self.split_entry(encoded.to_vec(), value).map(|e| Some(e.record_id)),
                None => Ok(None),
            },
            UniquenessPolicy::Standard => {
                let end = increment_prefix(encoded);
                let upper = end.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
                match tx.first_entry(&self.uri, Bound::Included(encoded), upper)? {
                    Some((k, v)) => self.split_entry(k, v).map(|e| Some(e.record_id)),
                    None => Ok(None),
                }
            }
        }
    }

    /// Open a cursor over the index.
    pub fn cursor<'a, T: Transaction + 'a>(
        &'a self,
        tx: &'a T,
        direction: CursorDirection,
    ) -> IndexResult<IndexCursor<'a, E, T>> {
        self.check_active()?;
        Ok(IndexCursor::new(self, tx, direction))
    }

    /// Start a bulk build. Normal writes fail with
    /// [`IndexError::BulkLoadInProgress`] until the builder is finished.
    ///
    /// # Errors
    ///
    /// [`IndexError::BulkLoadInProgress`] if another builder is open.
    pub fn bulk_builder<'a, T: Transaction>(
        &'a self,
        tx: &'a mut T,
        dups_allowed: bool,
    ) -> IndexResult<BulkBuilder<'a, E, T>> {
        self.check_active()?;
        if self
            .bulk_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(IndexError::BulkLoadInProgress { index: self.name().to_owned() });
        }
        Ok(BulkBuilder::new(self, tx, dups_allowed))
    }

    /// Walk the index checking every entry and the order between neighbours.
    ///
    /// Without `full` only the keyspace registration is checked and
    /// `num_keys` is left unset. Anomalies are recorded in the report.
    pub fn full_validate<T: Transaction>(&self, tx: &T, full: bool) -> IndexResult<ValidateReport> {
        self.check_active()?;
        let mut report = ValidateReport::default();

        if tx.keyspace_config(&self.uri)?.is_none() {
            report.warning(self.name(), format!("keyspace {} is not registered", self.uri));
        }
        if !full {
            return Ok(report);
        }

        let mut cursor = tx.cursor(&self.uri)?;
        let mut num_keys = 0u64;
        let mut previous: Option<(Vec<Value>, RecordId)> = None;
        while let Some((k, v)) = cursor.next()? {
            num_keys += 1;
            let Some(current) = self.validate_entry(num_keys, &k, &v, &mut report) else {
                continue;
            };
            if let Some(prev) = &previous {
                self.validate_order(num_keys, prev, &current, &mut report);
            }
            previous = Some(current);
        }
        report.num_keys = Some(num_keys);
        Ok(report)
    }

    /// Check one entry's shape, returning its decoded key and record id when
    /// both are readable.
    fn validate_entry(
        &self,
        n: u64,
        key: &[u8],
        value: &[u8],
        report: &mut ValidateReport,
    ) -> Option<(Vec<Value>, RecordId)> {
        match self.policy {
            UniquenessPolicy::Unique => {
                let decoded = match self.coder.decode(key) {
                    Ok(decoded) => Some(decoded),
                    Err(e) => {
                        report.error(self.name(), format!("entry {n}: undecodable key: {e}"));
                        None
                    }
                };
                let id = RecordId::from_bytes(value);
                if id.is_none() {
                    report.error(
                        self.name(),
                        format!("entry {n}: value of {} bytes is not a record id", value.len()),
                    );
                }
                decoded.zip(id)
            }
            UniquenessPolicy::Standard => match self.coder.decode_prefix(key) {
                Ok((decoded, consumed)) if key.len() - consumed == RecordId::ENCODED_LEN => {
                    if !value.is_empty() {
                        report.warning(
                            self.name(),
                            format!("entry {n}: unexpected {} byte value", value.len()),
                        );
                    }
                    RecordId::from_bytes(&key[consumed..]).map(|id| (decoded, id))
                }
                Ok((_, consumed)) => {
                    report.error(
                        self.name(),
                        format!("entry {n}: {} bytes follow the key", key.len() - consumed),
                    );
                    None
                }
                Err(e) => {
                    report.error(self.name(), format!("entry {n}: undecodable key: {e}"));
                    None
                }
            },
        }
    }

    /// Check that an entry sorts after its predecessor under the declared
    /// directions. Within one key a unique index allows a single entry and a
    /// standard index needs rising record ids.
    fn validate_order(
        &self,
        n: u64,
        (prev_key, prev_id): &(Vec<Value>, RecordId),
        (key, id): &(Vec<Value>, RecordId),
        report: &mut ValidateReport,
    ) {
        let order = self.coder.compare(prev_key, key);
        if order.is_gt() {
            report.error(
                self.name(),
                format!(
                    "entry {n}: key {} is out of order after {}",
                    self.render_key(key),
                    self.render_key(prev_key)
                ),
            );
        } else if order.is_eq() {
            match self.policy {
                UniquenessPolicy::Unique => report.error(
                    self.name(),
                    format!("entry {n}: key {} appears more than once", self.render_key(key)),
                ),
                UniquenessPolicy::Standard if id <= prev_id => report.error(
                    self.name(),
                    format!(
                        "entry {n}: record id {id} under key {} does not follow {prev_id}",
                        self.render_key(key)
                    ),
                ),
                UniquenessPolicy::Standard => {}
            }
        }
    }

    /// Add statistics to `out`, scaling sizes by `scale`.
    ///
    /// Returns `false` if the engine cannot supply statistics.
    #[allow(clippy::cast_precision_loss)]
    pub fn append_custom_stats<T: Transaction>(
        &self,
        tx: &T,
        out: &mut serde_json::Map<String, serde_json::Value>,
        scale: f64,
    ) -> IndexResult<bool> {
        self.check_active()?;
        let Some(stats) = tx.keyspace_stats(&self.uri)? else {
            warn!(index = %self.name(), "engine cannot supply index statistics");
            return Ok(false);
        };

        let scale = if scale > 0.0 { scale } else { 1.0 };
        let counter = |c: &AtomicU64| c.load(Ordering::Relaxed);

        out.insert("entries".into(), json!(stats.entries));
        out.insert("key_bytes".into(), json!(stats.key_bytes));
        out.insert("value_bytes".into(), json!(stats.value_bytes));
        out.insert("size".into(), json!(stats.total_bytes() as f64 / scale));
        out.insert("thread_contexts".into(), json!(self.contexts.len()));
        out.insert("inserts".into(), json!(counter(&self.counters.inserts)));
        out.insert("removes".into(), json!(counter(&self.counters.removes)));
        out.insert(
            "duplicate_rejections".into(),
            json!(counter(&self.counters.duplicate_rejections)),
        );
        Ok(true)
    }

    /// Pull the index into the engine's cache. An engine without support is
    /// not an error.
    pub fn touch<T: Transaction>(&self, tx: &T) -> IndexResult<()> {
        self.check_active()?;
        if !tx.prefetch(&self.uri)? {
            warn!(index = %self.name(), "engine does not support touch");
        }
        Ok(())
    }

    /// Approximate bytes used by the index, or 0 if the engine cannot say.
    pub fn space_used_bytes<T: Transaction>(&self, tx: &T) -> IndexResult<u64> {
        self.check_active()?;
        Ok(tx.keyspace_stats(&self.uri)?.map_or(0, |s| s.total_bytes()))
    }

    /// Decode the key bytes of an [`IndexEntry`].
    pub fn decode_key(&self, bytes: &[u8]) -> IndexResult<Vec<Value>> {
        Ok(self.coder.decode(bytes)?)
    }

    /// The error reported when `key` is already bound to another record.
    pub fn dup_key_error(&self, key: &[Value]) -> IndexError {
        IndexError::DuplicateKey { index: self.name().to_owned(), key: self.render_key(key) }
    }

    /// Render a key tuple as `{ field: value, ... }`.
    pub(crate) fn render_key(&self, key: &[Value]) -> String {
        let mut out = String::from("{");
        for (i, (field, value)) in self.descriptor.key_pattern.iter().zip(key).enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            let _ = write!(out, "{sep}{}: {value}", field.field);
        }
        out.push_str(" }");
        out
    }

    /// Render encoded key bytes, falling back to hex if they do not decode.
    pub(crate) fn render_encoded(&self, bytes: &[u8]) -> String {
        match self.coder.decode(bytes) {
            Ok(key) => self.render_key(&key),
            Err(_) => bytes.iter().fold(String::from("0x"), |mut s, b| {
                let _ = write!(s, "{b:02x}");
                s
            }),
        }
    }

    /// Split a physical entry into key bytes and record id.
    fn split_entry(&self, mut key: Vec<u8>, value: Vec<u8>) -> IndexResult<IndexEntry> {
        let id_bytes = match self.policy {
            UniquenessPolicy::Unique => value,
            UniquenessPolicy::Standard => {
                let at = key.len().checked_sub(RecordId::ENCODED_LEN).ok_or_else(|| {
                    IndexError::InvalidKey(format!("entry in {} is too short", self.uri))
                })?;
                key.split_off(at)
            }
        };
        let record_id = RecordId::from_bytes(&id_bytes).ok_or_else(|| {
            IndexError::InvalidKey(format!("corrupt record id in {}", self.uri))
        })?;
        Ok(IndexEntry { key, record_id })
    }
}
