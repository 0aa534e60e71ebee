//! [`RedbTransaction`] and its keyspace cursor.
//!
//! All keyspaces share [`DATA_TABLE`]; every operation translates a logical
//! `(keyspace, key)` pair into the physical key `keyspace 0x00 key` and
//! keeps scans inside the keyspace's physical range.
//!
//! A [`RedbCursor`] never holds more than [`WINDOW`] entries. Moving past
//! either end of its window fetches the neighbouring window from redb.

use std::ops::Bound;

use redb::{ReadTransaction, ReadableTable, WriteTransaction};
use tracing::info;

use crate::engine::{
    Cursor, CursorResult, KeyValue, KeyspaceStats, StorageError, StorageResult, Transaction,
};

use super::options::KeyspaceOptions;
use super::tables::{
    decode_key, encode_key, keyspace_end_key, keyspace_start_key, names, validate_name,
    DATA_TABLE,
};

/// Entries a cursor pulls from redb per fetch.
const WINDOW: usize = 1000;

#[allow(clippy::needless_pass_by_value)]
fn internal(e: impl std::fmt::Display) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Open the data table in either transaction kind and evaluate `$body` with
/// it bound to `$table`. A read transaction that has never seen a write has
/// no data table; `$missing` is returned in that case.
macro_rules! with_data_table {
    ($tx:expr, |$table:ident| $body:expr, missing => $missing:expr) => {
        match $tx {
            RedbTransaction::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok($table) => $body,
                Err(redb::TableError::TableDoesNotExist(_)) => $missing,
                Err(e) => Err(internal(e)),
            },
            RedbTransaction::Write(tx) => match tx.open_table(DATA_TABLE) {
                Ok($table) => $body,
                Err(redb::TableError::TableDoesNotExist(_)) => $missing,
                Err(e) => Err(internal(e)),
            },
        }
    };
}

/// A transaction for the Redb storage engine.
///
/// Note: `large_enum_variant` is allowed because boxing the
/// `WriteTransaction` would add an indirection to every operation.
#[allow(clippy::large_enum_variant)]
pub enum RedbTransaction {
    /// A read-only transaction.
    Read(ReadTransaction),
    /// A read-write transaction.
    Write(WriteTransaction),
}

impl RedbTransaction {
    /// Create a new read-only transaction.
    pub const fn new_read(tx: ReadTransaction) -> Self {
        Self::Read(tx)
    }

    /// Create a new read-write transaction.
    pub const fn new_write(tx: WriteTransaction) -> Self {
        Self::Write(tx)
    }

    /// Read up to `limit` entries between two physical bounds, taken from
    /// the high end when `from_high`. Entries come back ascending.
    fn fetch(
        &self,
        lower: &Bound<Vec<u8>>,
        upper: &Bound<Vec<u8>>,
        from_high: bool,
        limit: usize,
    ) -> StorageResult<Vec<KeyValue>> {
        with_data_table!(self, |t| scan(&t, lower, upper, from_high, limit), missing => Ok(Vec::new()))
    }
}

/// Physical lower bound of a logical range in `keyspace`.
fn physical_lower(keyspace: &str, bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(k) => Bound::Included(encode_key(keyspace, k)),
        Bound::Excluded(k) => Bound::Excluded(encode_key(keyspace, k)),
        Bound::Unbounded => Bound::Included(keyspace_start_key(keyspace)),
    }
}

/// Physical upper bound of a logical range in `keyspace`.
fn physical_upper(keyspace: &str, bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(k) => Bound::Included(encode_key(keyspace, k)),
        Bound::Excluded(k) => Bound::Excluded(encode_key(keyspace, k)),
        Bound::Unbounded => Bound::Excluded(keyspace_end_key(keyspace)),
    }
}

/// The stricter of a range's lower bound and a seek target.
fn clamp_lower(lower: &Bound<Vec<u8>>, target: Vec<u8>) -> Bound<Vec<u8>> {
    match lower {
        Bound::Included(k) if *k > target => Bound::Included(k.clone()),
        Bound::Excluded(k) if *k >= target => Bound::Excluded(k.clone()),
        _ => Bound::Included(target),
    }
}

fn as_slice_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(k) => Bound::Included(k.as_slice()),
        Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// Whether a pair of bounds admits no key at all.
fn is_empty_range(lower: &Bound<Vec<u8>>, upper: &Bound<Vec<u8>>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo) | Bound::Excluded(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi)) => lo >= hi,
        _ => false,
    }
}

/// Read up to `limit` entries between two physical bounds, from the low end
/// or, when `reverse`, from the high end. Results are in ascending order.
fn scan<T>(
    table: &T,
    lower: &Bound<Vec<u8>>,
    upper: &Bound<Vec<u8>>,
    reverse: bool,
    limit: usize,
) -> StorageResult<Vec<KeyValue>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    if is_empty_range(lower, upper) {
        return Ok(Vec::new());
    }

    let range = table
        .range::<&[u8]>((as_slice_bound(lower), as_slice_bound(upper)))
        .map_err(internal)?;

    if reverse {
        let mut entries = collect(range.rev(), limit)?;
        entries.reverse();
        Ok(entries)
    } else {
        collect(range, limit)
    }
}

type RawEntry<'a> =
    Result<(redb::AccessGuard<'a, &'static [u8]>, redb::AccessGuard<'a, &'static [u8]>), redb::StorageError>;

/// Decode up to `limit` physical entries into logical key-value pairs.
fn collect<'a>(
    iter: impl Iterator<Item = RawEntry<'a>>,
    limit: usize,
) -> StorageResult<Vec<KeyValue>> {
    let mut entries = Vec::with_capacity(limit.min(1024));
    for result in iter {
        if entries.len() >= limit {
            break;
        }
        let (k, v) = result.map_err(internal)?;
        if let Some((_, key)) = decode_key(k.value()) {
            entries.push((key.to_vec(), v.value().to_vec()));
        }
    }
    Ok(entries)
}

fn lookup<T>(table: &T, physical: &[u8]) -> StorageResult<Option<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table.get(physical).map_err(internal)?.map(|v| v.value().to_vec()))
}

fn measure<T>(table: &T, keyspace: &str) -> StorageResult<KeyspaceStats>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let start = keyspace_start_key(keyspace);
    let end = keyspace_end_key(keyspace);
    let prefix_len = start.len() as u64;

    let mut stats = KeyspaceStats::default();
    for result in table.range(start.as_slice()..end.as_slice()).map_err(internal)? {
        let (k, v) = result.map_err(internal)?;
        stats.entries += 1;
        stats.key_bytes += k.value().len() as u64 - prefix_len;
        stats.value_bytes += v.value().len() as u64;
    }
    Ok(stats)
}

impl Transaction for RedbTransaction {
    type Cursor<'a>
        = RedbCursor<'a>
    where
        Self: 'a;

    fn get(&self, keyspace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let encoded_key = encode_key(keyspace, key);
        with_data_table!(self, |t| lookup(&t, &encoded_key), missing => Ok(None))
    }

    fn put(&mut self, keyspace: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded_key = encode_key(keyspace, key);
                let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
                t.insert(encoded_key.as_slice(), value).map_err(internal)?;
                Ok(())
            }
        }
    }

    fn delete(&mut self, keyspace: &str, key: &[u8]) -> Result<bool, StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded_key = encode_key(keyspace, key);
                let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
                let removed = t.remove(encoded_key.as_slice()).map_err(internal)?;
                Ok(removed.is_some())
            }
        }
    }

    fn cursor(&self, keyspace: &str) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(self, keyspace, Bound::Unbounded, Bound::Unbounded))
    }

    fn range(
        &self,
        keyspace: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(self, keyspace, start, end))
    }

    fn first_entry(&self, keyspace: &str, start: Bound<&[u8]>, end: Bound<&[u8]>) -> CursorResult {
        let lower = physical_lower(keyspace, start);
        let upper = physical_upper(keyspace, end);
        Ok(self.fetch(&lower, &upper, false, 1)?.pop())
    }

    fn create_keyspace(&mut self, keyspace: &str, config: &str) -> Result<(), StorageError> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly);
        }
        validate_name(keyspace)?;
        KeyspaceOptions::parse(config)?;

        match self.keyspace_config(keyspace)? {
            Some(existing) if existing == config => Ok(()),
            Some(_) => Err(StorageError::KeyspaceExists(keyspace.to_owned())),
            None => {
                self.put(names::KEYSPACES, keyspace.as_bytes(), config.as_bytes())?;
                info!(keyspace, "created keyspace");
                Ok(())
            }
        }
    }

    fn keyspace_config(&self, keyspace: &str) -> Result<Option<String>, StorageError> {
        self.get(names::KEYSPACES, keyspace.as_bytes())?
            .map(|raw| String::from_utf8(raw).map_err(internal))
            .transpose()
    }

    fn keyspace_stats(&self, keyspace: &str) -> Result<Option<KeyspaceStats>, StorageError> {
        with_data_table!(
            self,
            |t| measure(&t, keyspace).map(Some),
            missing => Ok(Some(KeyspaceStats::default()))
        )
    }

    fn prefetch(&self, keyspace: &str) -> Result<bool, StorageError> {
        // Reading every page of the keyspace pulls it into redb's cache.
        self.keyspace_stats(keyspace).map(|_| true)
    }

    fn commit(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.commit().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn rollback(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.abort().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

/// A windowed cursor over one keyspace of a [`RedbTransaction`].
pub struct RedbCursor<'a> {
    tx: &'a RedbTransaction,
    keyspace: String,
    /// Physical bounds of the cursor's range.
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
    /// Fetched entries, ascending.
    window: Vec<KeyValue>,
    pos: Option<usize>,
    current: Option<KeyValue>,
}

impl<'a> RedbCursor<'a> {
    fn new(tx: &'a RedbTransaction, keyspace: &str, start: Bound<&[u8]>, end: Bound<&[u8]>) -> Self {
        Self {
            tx,
            keyspace: keyspace.to_owned(),
            lower: physical_lower(keyspace, start),
            upper: physical_upper(keyspace, end),
            window: Vec::new(),
            pos: None,
            current: None,
        }
    }

    /// Replace the window, positioned on its first entry or, with
    /// `at_last`, its last. An empty window unpositions the cursor.
    fn install(&mut self, window: Vec<KeyValue>, at_last: bool) -> CursorResult {
        self.pos = match window.len() {
            0 => None,
            n if at_last => Some(n - 1),
            _ => Some(0),
        };
        self.window = window;
        self.refresh()
    }

    fn step_to(&mut self, pos: usize) -> CursorResult {
        self.pos = Some(pos);
        self.refresh()
    }

    fn refresh(&mut self) -> CursorResult {
        self.current = self.pos.and_then(|p| self.window.get(p).cloned());
        Ok(self.current.clone())
    }

    fn physical(&self, key: &[u8]) -> Vec<u8> {
        encode_key(&self.keyspace, key)
    }
}

impl Cursor for RedbCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> CursorResult {
        let lower = clamp_lower(&self.lower, self.physical(key));
        let window = self.tx.fetch(&lower, &self.upper, false, WINDOW)?;
        self.install(window, false)
    }

    fn seek_first(&mut self) -> CursorResult {
        let window = self.tx.fetch(&self.lower, &self.upper, false, WINDOW)?;
        self.install(window, false)
    }

    fn seek_last(&mut self) -> CursorResult {
        let window = self.tx.fetch(&self.lower, &self.upper, true, WINDOW)?;
        self.install(window, true)
    }

    fn next(&mut self) -> CursorResult {
        let Some(pos) = self.pos else {
            return self.seek_first();
        };
        if pos + 1 < self.window.len() {
            return self.step_to(pos + 1);
        }

        let after = Bound::Excluded(self.physical(&self.window[pos].0));
        let window = self.tx.fetch(&after, &self.upper, false, WINDOW)?;
        self.install(window, false)
    }

    fn prev(&mut self) -> CursorResult {
        match self.pos {
            None => self.seek_last(),
            Some(pos) if pos > 0 => self.step_to(pos - 1),
            Some(pos) => {
                let before = Bound::Excluded(self.physical(&self.window[pos].0));
                let window = self.tx.fetch(&self.lower, &before, true, WINDOW)?;
                self.install(window, true)
            }
        }
    }

    fn current(&self) -> Option<(&[u8], &[u8])> {
        self.current.as_ref().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
