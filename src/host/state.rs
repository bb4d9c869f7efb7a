//! Per-actor state handed to user constructors and test callbacks.

use crate::error::{catch_panic, ActorError, HarnessError, Result};
use crate::id::ActorId;
use crate::storage::ActorStorage;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Shared flag recording that an actor host was aborted, and why.
///
/// Once set it is never cleared. The host and every stub pointing at it share one.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<Mutex<Option<String>>>);

impl AbortSignal {
    pub fn abort(&self, reason: impl Into<String>) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(reason.into());
        }
    }

    pub fn reason(&self) -> Option<String> {
        self.0.lock().clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.0.lock().is_some()
    }

    /// `Err(Aborted)` if the signal is set.
    pub fn check(&self) -> Result<()> {
        match self.reason() {
            Some(reason) => Err(HarnessError::Aborted { reason }),
            None => Ok(()),
        }
    }
}

struct StateInner {
    id: ActorId,
    storage: Arc<dyn ActorStorage>,
    abort: AbortSignal,
}

/// The actor's view of its own host: id, storage, and the blocking initializer.
#[derive(Clone)]
pub struct ActorState {
    inner: Arc<StateInner>,
}

impl ActorState {
    pub(crate) fn new(id: ActorId, storage: Arc<dyn ActorStorage>, abort: AbortSignal) -> Self {
        Self {
            inner: Arc::new(StateInner { id, storage, abort }),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.inner.id
    }

    pub fn storage(&self) -> &Arc<dyn ActorStorage> {
        &self.inner.storage
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.abort.is_aborted()
    }

    pub(crate) fn abort_signal(&self) -> &AbortSignal {
        &self.inner.abort
    }

    /// Runs `work` to completion before the host accepts anything else.
    ///
    /// Hosts already process one call at a time, so awaiting `work` here holds every
    /// other call back. If `work` fails the host is aborted for good: this call and
    /// every later one fail, and a fresh reference gets a fresh host. A panic in `work`
    /// counts as a failure.
    pub async fn block_concurrency_while<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ActorError>>,
    {
        self.inner.abort.check()?;
        match catch_panic(work).await {
            Ok(value) => Ok(value),
            Err(e) => {
                let reason = e.to_string();
                warn!(actor_id = %self.inner.id, %reason, "Blocking work failed, aborting actor");
                self.inner.abort.abort(reason);
                Err(HarnessError::user(e))
            }
        }
    }
}

impl std::fmt::Debug for ActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorState")
            .field("id", &self.inner.id)
            .field("aborted", &self.inner.abort.reason())
            .finish()
    }
}
