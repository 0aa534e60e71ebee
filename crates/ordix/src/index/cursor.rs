//! Directional cursors over an index.

use std::ops::Bound;

use ordix_core::encoding::increment_prefix;
use ordix_core::{RecordId, Value};
use ordix_storage::{Cursor, StorageEngine, Transaction};

use super::SortedIndex;
use crate::error::IndexResult;

/// Iteration order of an [`IndexCursor`], fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorDirection {
    /// Ascending key order.
    #[default]
    Forward,
    /// Descending key order.
    Backward,
}

/// One (key, record) pair produced by a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Encoded key bytes; see [`SortedIndex::decode_key`].
    pub key: Vec<u8>,
    /// The record the key points to.
    pub record_id: RecordId,
}

/// A re-seekable cursor bound to one index and one transaction.
///
/// Once [`next`](Self::next) returns `None` the cursor stays exhausted until
/// it is positioned again with [`seek`](Self::seek) or
/// [`seek_to_start`](Self::seek_to_start).
pub struct IndexCursor<'a, E: StorageEngine, T: Transaction + 'a> {
    index: &'a SortedIndex<E>,
    tx: &'a T,
    direction: CursorDirection,
    inner: Option<T::Cursor<'a>>,
    current: Option<IndexEntry>,
    exhausted: bool,
}

impl<'a, E: StorageEngine, T: Transaction + 'a> IndexCursor<'a, E, T> {
    pub(super) fn new(index: &'a SortedIndex<E>, tx: &'a T, direction: CursorDirection) -> Self {
        Self { index, tx, direction, inner: None, current: None, exhausted: false }
    }

    /// Iteration order.
    pub fn direction(&self) -> CursorDirection {
        self.direction
    }

    /// Position before the first entry in cursor direction.
    pub fn seek_to_start(&mut self) -> IndexResult<()> {
        self.inner = Some(self.tx.cursor(self.index.uri())?);
        self.current = None;
        self.exhausted = false;
        Ok(())
    }

    /// Position at `key` and return the first entry at or past it in cursor
    /// direction. With `inclusive` false, entries equal to `key` are skipped.
    pub fn seek(&mut self, key: &[Value], inclusive: bool) -> IndexResult<Option<IndexEntry>> {
        let index = self.index;
        let tx = self.tx;
        let uri = index.uri();

        let mut ctx = index.contexts.acquire()?;
        let encoded = ctx.encode(key)?;
        // Every physical key under `encoded` starts with it.
        let past = increment_prefix(encoded);

        let inner = match (self.direction, inclusive) {
            (CursorDirection::Forward, true) => {
                Some(tx.range(uri, Bound::Included(encoded), Bound::Unbounded)?)
            }
            (CursorDirection::Forward, false) => match past.as_deref() {
                Some(past) => Some(tx.range(uri, Bound::Included(past), Bound::Unbounded)?),
                None => None,
            },
            (CursorDirection::Backward, true) => {
                let upper = past.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
                Some(tx.range(uri, Bound::Unbounded, upper)?)
            }
            (CursorDirection::Backward, false) => {
                Some(tx.range(uri, Bound::Unbounded, Bound::Excluded(encoded))?)
            }
        };
        drop(ctx);

        self.exhausted = inner.is_none();
        self.inner = inner;
        self.current = None;
        self.advance()
    }

    /// Advance and return the next entry, or `None` once exhausted.
    ///
    /// An unpositioned cursor starts from the first entry in its direction.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> IndexResult<Option<IndexEntry>> {
        if self.inner.is_none() && !self.exhausted {
            self.seek_to_start()?;
        }
        self.advance()
    }

    /// The entry last returned, if the cursor is positioned.
    pub fn current(&self) -> Option<&IndexEntry> {
        self.current.as_ref()
    }

    /// Whether the cursor has run off the end.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn advance(&mut self) -> IndexResult<Option<IndexEntry>> {
        let step = match (self.exhausted, self.inner.as_mut()) {
            (false, Some(inner)) => match self.direction {
                CursorDirection::Forward => inner.next()?,
                CursorDirection::Backward => inner.prev()?,
            },
            _ => None,
        };

        match step {
            Some((k, v)) => {
                let entry = self.index.split_entry(k, v)?;
                self.current = Some(entry.clone());
                Ok(Some(entry))
            }
            None => {
                self.exhausted = true;
                self.current = None;
                Ok(None)
            }
        }
    }
}
