//! Sequential bulk loading.
//!
//! A [`BulkBuilder`] accepts entries in key order and writes them to the
//! transaction in one pass on [`commit`](BulkBuilder::commit). Nothing
//! reaches the transaction before that, so an abandoned build leaves no
//! entries behind. A commit that is rejected writes nothing either.

use std::cmp::Ordering as KeyOrdering;
use std::sync::atomic::Ordering;

use ordix_core::{RecordId, Value};
use ordix_storage::{KeyValue, StorageEngine, Transaction};
use tracing::{debug, info};

use super::{SortedIndex, UniquenessPolicy};
use crate::error::{IndexError, IndexResult};

/// Exclusive, ordered loader for one index.
///
/// Keys must arrive in non-decreasing order. Equal keys are resolved by
/// policy: on a unique index the later record wins when duplicates are
/// allowed and is rejected otherwise; on a standard index the record ids of
/// one key must strictly increase. The same rule covers keys the index
/// already holds: without duplicates a unique index refuses to rebind them.
pub struct BulkBuilder<'a, E: StorageEngine, T: Transaction> {
    index: &'a SortedIndex<E>,
    tx: &'a mut T,
    dups_allowed: bool,
    entries: Vec<KeyValue>,
    previous: Option<(Vec<u8>, RecordId)>,
}

impl<'a, E: StorageEngine, T: Transaction> BulkBuilder<'a, E, T> {
    pub(super) fn new(index: &'a SortedIndex<E>, tx: &'a mut T, dups_allowed: bool) -> Self {
        debug!(index = %index.name(), dups_allowed, "bulk build started");
        Self { index, tx, dups_allowed, entries: Vec::new(), previous: None }
    }

    /// Buffer one entry.
    ///
    /// # Errors
    ///
    /// - [`IndexError::OutOfOrderInsert`] if `key` sorts before the previous
    ///   key, or repeats it with a non-increasing record id on a standard index
    /// - [`IndexError::DuplicateKey`] if `key` repeats on a unique index that
    ///   does not allow duplicates
    ///
    /// A rejected entry leaves the builder unchanged.
    pub fn add(&mut self, key: &[Value], id: RecordId) -> IndexResult<()> {
        let index = self.index;
        let mut ctx = index.contexts.acquire()?;
        let encoded = ctx.encode(key)?;

        if let Some((previous, previous_id)) = &self.previous {
            match encoded.cmp(previous.as_slice()) {
                KeyOrdering::Less => return Err(self.out_of_order(key, previous)),
                KeyOrdering::Equal => match index.policy {
                    UniquenessPolicy::Unique if self.dups_allowed => {
                        self.entries.pop();
                    }
                    UniquenessPolicy::Unique => {
                        index.counters.duplicate_rejections.fetch_add(1, Ordering::Relaxed);
                        return Err(index.dup_key_error(key));
                    }
                    UniquenessPolicy::Standard if id <= *previous_id => {
                        return Err(self.out_of_order(key, previous));
                    }
                    UniquenessPolicy::Standard => {}
                },
                KeyOrdering::Greater => {}
            }
        }

        let encoded = encoded.to_vec();
        let entry = match index.policy {
            UniquenessPolicy::Unique => (encoded.clone(), id.to_bytes().to_vec()),
            UniquenessPolicy::Standard => {
                let mut physical = encoded.clone();
                physical.extend_from_slice(&id.to_bytes());
                (physical, Vec::new())
            }
        };
        self.entries.push(entry);
        self.previous = Some((encoded, id));
        Ok(())
    }

    fn out_of_order(&self, key: &[Value], previous: &[u8]) -> IndexError {
        IndexError::OutOfOrderInsert {
            index: self.index.name().to_owned(),
            key: self.index.render_key(key),
            previous: self.index.render_encoded(previous),
        }
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every buffered entry to the transaction and return how many
    /// were written.
    ///
    /// # Errors
    ///
    /// - [`IndexError::DuplicateKey`] if the index is unique, duplicates are
    ///   not allowed, and a buffered key is already bound to another record.
    ///   Nothing is written.
    /// - [`IndexError::Engine`] if a write fails; the caller should then roll
    ///   back the transaction.
    pub fn commit(mut self) -> IndexResult<u64> {
        let entries = std::mem::take(&mut self.entries);
        let uri = self.index.uri();

        if self.index.policy == UniquenessPolicy::Unique && !self.dups_allowed {
            self.check_existing(&entries)?;
        }

        for (key, value) in &entries {
            self.tx.put(uri, key, value)?;
        }

        let written = entries.len() as u64;
        self.index.counters.inserts.fetch_add(written, Ordering::Relaxed);
        info!(index = %self.index.name(), entries = written, "bulk build committed");
        Ok(written)
    }

    fn check_existing(&self, entries: &[KeyValue]) -> IndexResult<()> {
        let index = self.index;
        for (key, value) in entries {
            match self.tx.get(index.uri(), key)? {
                Some(existing) if existing != *value => {
                    index.counters.duplicate_rejections.fetch_add(1, Ordering::Relaxed);
                    debug!(index = %index.name(), "bulk build rejected by an existing entry");
                    return Err(IndexError::DuplicateKey {
                        index: index.name().to_owned(),
                        key: index.render_encoded(key),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Discard every buffered entry.
    pub fn abort(self) {
        debug!(index = %self.index.name(), discarded = self.entries.len(), "bulk build aborted");
    }
}

impl<E: StorageEngine, T: Transaction> Drop for BulkBuilder<'_, E, T> {
    fn drop(&mut self) {
        self.index.bulk_active.store(false, Ordering::Release);
    }
}
