//! # Result Correlation Store
//!
//! Control actions travel to an actor host as a bare id; everything that cannot cross
//! the boundary (the callback to run, the value it produced, the live instance, an
//! error object) stays in this registry under that id.
//!
//! The lifecycle of one id:
//!
//! ```text
//! allocate ──► [register_callback] ──► call issued ──► put_outcome ──► take_outcome
//!  (client)        (client)                             (host)            (client)
//! ```
//!
//! Each phase is performed by exactly one party, and the allocator never hands out an
//! id twice, so distinct ids never interfere even when they target the same actor.
//! Writing an outcome twice or reading one that is absent is a usage error.
//!
//! One registry is owned by each [`Runtime`](crate::Runtime) and shared by all of its
//! hosts. [`ActionRegistry::teardown`] drops everything left over, which is what the
//! runtime does between test runs.

use crate::actor::LiveInstance;
use crate::error::{ActorError, HarnessError, Result};
use crate::host::ActorState;
use crate::transport::ActionId;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A test callback waiting to run inside an actor's execution context.
///
/// Errors raised by the test's own code must arrive as [`HarnessError::UserCode`]; the
/// host stores those and replies `500`. Any other variant propagates as is.
pub type ContextCallback =
    Box<dyn FnOnce(LiveInstance, ActorState) -> BoxFuture<'static, Result<Box<dyn Any + Send>>> + Send>;

/// What an action left behind.
pub enum Outcome {
    /// The action completed without producing a value.
    Undefined,
    Value(Box<dyn Any + Send>),
    Instance(Arc<dyn Any + Send + Sync>),
    Error(ActorError),
    /// The real result is the raw transport response.
    UseTransportResponse,
}

impl Outcome {
    fn describe(&self) -> &'static str {
        match self {
            Outcome::Undefined => "undefined",
            Outcome::Value(_) => "value",
            Outcome::Instance(_) => "instance",
            Outcome::Error(_) => "error",
            Outcome::UseTransportResponse => "use-transport-response",
        }
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Error(e) => write!(f, "Outcome::Error({})", e),
            other => write!(f, "Outcome::{}", other.describe()),
        }
    }
}

enum Slot {
    Callback(ContextCallback),
    Outcome(Outcome),
}

/// Isolate-scoped map from action id to callback or outcome.
pub struct ActionRegistry {
    next_id: AtomicU64,
    slots: Mutex<HashMap<ActionId, Slot>>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Hands out a fresh id. Ids are never reused, not even across `teardown`.
    pub fn allocate(&self) -> ActionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register_callback(&self, id: ActionId, callback: ContextCallback) -> Result<()> {
        let mut slots = self.slots.lock();
        if slots.contains_key(&id) {
            return Err(HarnessError::Usage(format!(
                "Action {} is already in use",
                id
            )));
        }
        slots.insert(id, Slot::Callback(callback));
        Ok(())
    }

    pub fn take_callback(&self, id: ActionId) -> Result<ContextCallback> {
        let mut slots = self.slots.lock();
        match slots.remove(&id) {
            Some(Slot::Callback(callback)) => Ok(callback),
            Some(Slot::Outcome(outcome)) => {
                slots.insert(id, Slot::Outcome(outcome));
                Err(HarnessError::Usage(format!(
                    "Action {} has no pending callback",
                    id
                )))
            }
            None => Err(HarnessError::Usage(format!(
                "No callback registered for action {}",
                id
            ))),
        }
    }

    /// Stores the outcome of an action. Only one outcome may be written per id.
    pub fn put_outcome(&self, id: ActionId, outcome: Outcome) -> Result<()> {
        let mut slots = self.slots.lock();
        if let Some(Slot::Outcome(existing)) = slots.get(&id) {
            return Err(HarnessError::Usage(format!(
                "Action {} already has an outcome ({})",
                id,
                existing.describe()
            )));
        }
        debug!(action_id = id, outcome = outcome.describe(), "Outcome stored");
        slots.insert(id, Slot::Outcome(outcome));
        Ok(())
    }

    /// Reads and removes the outcome of an action.
    pub fn take_outcome(&self, id: ActionId) -> Result<Outcome> {
        let mut slots = self.slots.lock();
        match slots.remove(&id) {
            Some(Slot::Outcome(outcome)) => Ok(outcome),
            Some(Slot::Callback(callback)) => {
                slots.insert(id, Slot::Callback(callback));
                Err(HarnessError::Usage(format!(
                    "Action {} has not produced an outcome",
                    id
                )))
            }
            None => Err(HarnessError::Usage(format!(
                "Expected an outcome for action {} but none was stored, or it was already read",
                id
            ))),
        }
    }

    /// Drops whatever is stored under `id`.
    pub fn discard(&self, id: ActionId) {
        self.slots.lock().remove(&id);
    }

    /// Number of ids with a callback or outcome still stored.
    pub fn pending(&self) -> usize {
        self.slots.lock().len()
    }

    /// Drops every stored callback and outcome.
    pub fn teardown(&self) {
        let leftover = std::mem::take(&mut *self.slots.lock());
        if !leftover.is_empty() {
            warn!(count = leftover.len(), "Dropping unconsumed actions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn noop_callback() -> ContextCallback {
        Box::new(|_: LiveInstance, _: ActorState| {
            async { Ok::<_, HarnessError>(Box::new(()) as Box<dyn Any + Send>) }.boxed()
        })
    }

    #[test]
    fn test_ids_are_monotonic() {
        let registry = ActionRegistry::new();
        let a = registry.allocate();
        let b = registry.allocate();
        registry.teardown();
        let c = registry.allocate();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_outcome_is_read_once() {
        let registry = ActionRegistry::new();
        let id = registry.allocate();
        registry
            .put_outcome(id, Outcome::Value(Box::new(5u32)))
            .unwrap();

        match registry.take_outcome(id).unwrap() {
            Outcome::Value(v) => assert_eq!(*v.downcast::<u32>().unwrap(), 5),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            registry.take_outcome(id),
            Err(HarnessError::Usage(_))
        ));
    }

    #[test]
    fn test_missing_outcome_is_usage_error() {
        let registry = ActionRegistry::new();
        let id = registry.allocate();
        assert!(matches!(
            registry.take_outcome(id),
            Err(HarnessError::Usage(_))
        ));
    }

    #[test]
    fn test_outcome_written_at_most_once() {
        let registry = ActionRegistry::new();
        let id = registry.allocate();
        registry.put_outcome(id, Outcome::Undefined).unwrap();
        assert!(registry.put_outcome(id, Outcome::Undefined).is_err());
    }

    #[test]
    fn test_callback_then_outcome() {
        let registry = ActionRegistry::new();
        let id = registry.allocate();
        registry.register_callback(id, noop_callback()).unwrap();
        assert!(registry.take_outcome(id).is_err());

        let _callback = registry.take_callback(id).unwrap();
        assert!(registry.take_callback(id).is_err());

        registry
            .put_outcome(id, Outcome::UseTransportResponse)
            .unwrap();
        assert!(matches!(
            registry.take_outcome(id).unwrap(),
            Outcome::UseTransportResponse
        ));
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn test_teardown_and_discard() {
        let registry = ActionRegistry::new();
        let a = registry.allocate();
        let b = registry.allocate();
        registry.register_callback(a, noop_callback()).unwrap();
        registry.put_outcome(b, Outcome::Undefined).unwrap();
        assert_eq!(registry.pending(), 2);

        registry.discard(a);
        assert_eq!(registry.pending(), 1);

        registry.teardown();
        assert_eq!(registry.pending(), 0);
    }
}
