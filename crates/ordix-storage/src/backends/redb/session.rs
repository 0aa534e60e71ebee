//! Engine sessions and the limiter that hands them out.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::engine::{Session, SessionId, StorageError};

/// Tracks live sessions against an optional cap.
#[derive(Debug)]
pub(super) struct SessionLimiter {
    max: Option<usize>,
    live: AtomicUsize,
    next_id: AtomicU64,
}

impl SessionLimiter {
    pub(super) fn new(max: Option<usize>) -> Self {
        Self { max, live: AtomicUsize::new(0), next_id: AtomicU64::new(1) }
    }

    /// Reserve a session slot.
    pub(super) fn acquire(self: &Arc<Self>) -> Result<RedbSession, StorageError> {
        let reserved = self.live.fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
            match self.max {
                Some(max) if live >= max => None,
                _ => Some(live + 1),
            }
        });

        if reserved.is_err() {
            return Err(StorageError::ResourceExhausted(format!(
                "all {} sessions are in use",
                self.max.unwrap_or_default()
            )));
        }

        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(session = %id, "opened session");
        Ok(RedbSession { id, limiter: Arc::clone(self) })
    }

    /// Number of sessions currently open.
    pub(super) fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

/// A session leased from a [`RedbEngine`](super::RedbEngine).
///
/// The slot is returned to the engine when the session is dropped.
#[derive(Debug)]
pub struct RedbSession {
    id: SessionId,
    limiter: Arc<SessionLimiter>,
}

impl Session for RedbSession {
    fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for RedbSession {
    fn drop(&mut self) {
        self.limiter.live.fetch_sub(1, Ordering::AcqRel);
        debug!(session = %self.id, "closed session");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cap_is_enforced_and_released_on_drop() {
        let limiter = Arc::new(SessionLimiter::new(Some(2)));

        let a = limiter.acquire().unwrap();
        let b = limiter.acquire().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(matches!(limiter.acquire(), Err(StorageError::ResourceExhausted(_))));

        drop(a);
        assert_eq!(limiter.live(), 1);
        assert!(limiter.acquire().is_ok());
    }

    #[test]
    fn unlimited_by_default() {
        let limiter = Arc::new(SessionLimiter::new(None));
        let sessions: Vec<_> = (0..64).map(|_| limiter.acquire().unwrap()).collect();
        assert_eq!(limiter.live(), 64);
        drop(sessions);
        assert_eq!(limiter.live(), 0);
    }
}
