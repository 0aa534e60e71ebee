//! Per-thread execution contexts.
//!
//! Every thread that touches an index gets one [`ThreadContext`]: an engine
//! session plus a reusable key buffer and coder. Contexts are created lazily,
//! live in a [`ContextCache`] owned by the index, and are only released when
//! the index is dropped.
//!
//! [`ContextCache::acquire`] checks the calling thread's context out of the
//! cache and returns a [`ContextHandle`] that checks it back in on drop. The
//! cache mutex is held for the map lookup and the check-in, never while the
//! context is in use.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use ordix_core::encoding::KeyCoder;
use ordix_core::{CoreError, RecordId, Value};
use ordix_storage::{Session, StorageEngine};
use tracing::debug;

use crate::error::{IndexError, IndexResult};

/// State cached for one thread.
#[derive(Debug)]
pub struct ThreadContext<S> {
    session: S,
    coder: KeyCoder,
    buf: Vec<u8>,
}

impl<S: Session> ThreadContext<S> {
    /// The engine session owned by this context.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Encode `key` into the context buffer.
    pub fn encode(&mut self, key: &[Value]) -> Result<&[u8], CoreError> {
        self.buf.clear();
        self.coder.encode_into(key, &mut self.buf)?;
        Ok(&self.buf)
    }

    /// Encode `key` followed by the record id.
    pub fn encode_with_id(&mut self, key: &[Value], id: RecordId) -> Result<&[u8], CoreError> {
        self.buf.clear();
        self.coder.encode_into(key, &mut self.buf)?;
        self.buf.extend_from_slice(&id.to_bytes());
        Ok(&self.buf)
    }

    /// Bytes last written by `encode` or `encode_with_id`.
    pub fn encoded(&self) -> &[u8] {
        &self.buf
    }
}

/// Cache of thread contexts for one index.
pub struct ContextCache<E: StorageEngine> {
    engine: Arc<E>,
    coder: KeyCoder,
    label: String,
    idle: Mutex<HashMap<ThreadId, ThreadContext<E::Session>>>,
    live: AtomicUsize,
}

impl<E: StorageEngine> ContextCache<E> {
    /// Create an empty cache.
    pub fn new(engine: Arc<E>, coder: KeyCoder, label: impl Into<String>) -> Self {
        Self {
            engine,
            coder,
            label: label.into(),
            idle: Mutex::new(HashMap::new()),
            live: AtomicUsize::new(0),
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<ThreadId, ThreadContext<E::Session>>> {
        // The map holds no invariant a panicking holder could break.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out the calling thread's context, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::ContextUnavailable`] if a new context is needed
    /// and the engine refuses to open a session.
    pub fn acquire(&self) -> IndexResult<ContextHandle<'_, E>> {
        let thread = thread::current().id();

        if let Some(ctx) = self.map().remove(&thread) {
            return Ok(ContextHandle { cache: self, thread, ctx: Some(ctx) });
        }

        let session = self.engine.open_session().map_err(IndexError::ContextUnavailable)?;
        debug!(index = %self.label, session = %session.id(), "created thread context");
        self.live.fetch_add(1, Ordering::Relaxed);

        let ctx = ThreadContext { session, coder: self.coder.clone(), buf: Vec::new() };
        Ok(ContextHandle { cache: self, thread, ctx: Some(ctx) })
    }

    fn check_in(&self, thread: ThreadId, ctx: ThreadContext<E::Session>) {
        let mut map = self.map();
        if map.contains_key(&thread) {
            // A nested acquire on this thread made a second context; keep one.
            drop(map);
            drop(ctx);
            self.live.fetch_sub(1, Ordering::Relaxed);
        } else {
            map.insert(thread, ctx);
        }
    }

    /// Number of contexts this cache holds, checked out or not.
    pub fn len(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Whether no thread has created a context yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A checked-out [`ThreadContext`]; returned to its cache on drop.
pub struct ContextHandle<'a, E: StorageEngine> {
    cache: &'a ContextCache<E>,
    thread: ThreadId,
    ctx: Option<ThreadContext<E::Session>>,
}

impl<E: StorageEngine> Deref for ContextHandle<'_, E> {
    type Target = ThreadContext<E::Session>;

    fn deref(&self) -> &Self::Target {
        match &self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("context is present until drop"),
        }
    }
}

impl<E: StorageEngine> DerefMut for ContextHandle<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("context is present until drop"),
        }
    }
}

impl<E: StorageEngine> Drop for ContextHandle<'_, E> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.cache.check_in(self.thread, ctx);
        }
    }
}
