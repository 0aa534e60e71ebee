//! [`RedbEngine`]: the [`StorageEngine`] that index keyspaces live in.
//!
//! One redb database holds every keyspace. Sessions are leased from a
//! [`SessionLimiter`] so a deployment can bound how many threads hold
//! index contexts at once.

use std::path::Path;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::{Builder, Database};

use crate::engine::{StorageEngine, StorageError};

use super::session::{RedbSession, SessionLimiter};
use super::transaction::RedbTransaction;

/// Tuning for a [`RedbEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RedbConfig {
    /// Page cache budget in bytes; redb picks its own when unset.
    pub cache_size: Option<usize>,

    /// Upper bound on live sessions; unbounded when unset.
    pub max_sessions: Option<usize>,
}

impl RedbConfig {
    /// Defaults: redb's cache size, no session cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Page cache budget in bytes.
    #[must_use]
    pub const fn cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = Some(bytes);
        self
    }

    /// Cap the number of concurrently open sessions.
    #[must_use]
    pub const fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = Some(max);
        self
    }

    fn builder(&self) -> Builder {
        let mut builder = Database::builder();
        if let Some(bytes) = self.cache_size {
            builder.set_cache_size(bytes);
        }
        builder
    }
}

/// Redb-backed engine holding any number of index keyspaces.
///
/// # Example
///
/// ```ignore
/// use ordix_storage::backends::RedbEngine;
///
/// let engine = RedbEngine::open("indexes.redb")?;
///
/// let mut tx = engine.begin_write()?;
/// tx.create_keyspace("index:c:x_1", "key_format=u")?;
/// tx.put("index:c:x_1", b"key", b"value")?;
/// tx.commit()?;
/// ```
pub struct RedbEngine {
    db: Database,
    sessions: Arc<SessionLimiter>,
}

impl RedbEngine {
    /// Engine name used to look up per-engine index options.
    pub const NAME: &'static str = "redb";

    /// Open the database file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`StorageError::Open`] if redb cannot open or create the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_config(path, RedbConfig::default())
    }

    /// Like [`open`](Self::open), with explicit tuning.
    ///
    /// # Errors
    ///
    /// [`StorageError::Open`] if redb cannot open or create the file.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: RedbConfig,
    ) -> Result<Self, StorageError> {
        let db = config.builder().create(path.as_ref()).map_err(open_error)?;
        Ok(Self::with_database(db, config))
    }

    /// A throwaway engine whose data vanishes on drop.
    ///
    /// # Errors
    ///
    /// [`StorageError::Open`] if redb fails to initialize the backend.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::in_memory_with_config(RedbConfig::default())
    }

    /// Like [`in_memory`](Self::in_memory), with explicit tuning.
    ///
    /// # Errors
    ///
    /// [`StorageError::Open`] if redb fails to initialize the backend.
    pub fn in_memory_with_config(config: RedbConfig) -> Result<Self, StorageError> {
        let db = config.builder().create_with_backend(InMemoryBackend::new()).map_err(open_error)?;
        Ok(Self::with_database(db, config))
    }

    fn with_database(db: Database, config: RedbConfig) -> Self {
        Self { db, sessions: Arc::new(SessionLimiter::new(config.max_sessions)) }
    }

    /// Sessions leased and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.sessions.live()
    }
}

fn open_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Open(e.to_string())
}

fn tx_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Transaction(e.to_string())
}

impl StorageEngine for RedbEngine {
    type Transaction<'a> = RedbTransaction;
    type Session = RedbSession;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        self.db.begin_read().map(RedbTransaction::new_read).map_err(tx_error)
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        self.db.begin_write().map(RedbTransaction::new_write).map_err(tx_error)
    }

    fn open_session(&self) -> Result<Self::Session, StorageError> {
        self.sessions.acquire()
    }
}
