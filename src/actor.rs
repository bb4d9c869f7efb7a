//! # User Actors
//!
//! This module defines what a wrapped user actor looks like to the harness.
//!
//! - [`DurableActor`]: the lifecycle hooks (`fetch`, `alarm`, web socket events). Only
//!   `fetch` is required in practice: calling a missing `fetch` is a usage error, while
//!   the other hooks default to silent no-ops.
//! - [`ActorClass`]: a named constructor exported from a module. Every call to
//!   [`ActorClass::new`] mints a new [`ClassIdentity`]; clones share it. The lifecycle
//!   manager compares identities to detect that the source changed underneath a warm
//!   actor.
//! - [`LiveInstance`]: the constructed object, held both as hook object and as a
//!   downcastable `Any` so test code can get a typed handle back.
//!
//! Hooks take `&self`. Actors keep durable state in [`ActorState::storage`] and use
//! interior mutability for anything in memory; the host guarantees only one hook runs
//! at a time.

use crate::error::{ActorError, HarnessError};
use crate::runtime::Env;
use crate::host::ActorState;
use crate::transport::{Request, Response, WebSocketMessage};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle hooks of a user actor.
#[async_trait]
pub trait DurableActor: Send + Sync + 'static {
    /// Handles an ordinary request. Actors that never receive requests may omit it.
    async fn fetch(&self, _request: Request) -> Result<Response, ActorError> {
        Err(Box::new(HarnessError::HandlerNotImplemented { hook: "fetch" }))
    }

    /// Called when the actor's scheduled alarm fires.
    async fn alarm(&self) -> Result<(), ActorError> {
        Ok(())
    }

    async fn web_socket_message(&self, _message: WebSocketMessage) -> Result<(), ActorError> {
        Ok(())
    }

    async fn web_socket_close(
        &self,
        _code: u16,
        _reason: String,
        _was_clean: bool,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    async fn web_socket_error(&self, _error: String) -> Result<(), ActorError> {
        Ok(())
    }
}

/// Identity of one evaluation of an actor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassIdentity(u64);

impl ClassIdentity {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClassIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

type Factory =
    Arc<dyn Fn(ActorState, Env) -> BoxFuture<'static, Result<LiveInstance, ActorError>> + Send + Sync>;

/// A named, constructible actor class.
#[derive(Clone)]
pub struct ActorClass {
    name: String,
    identity: ClassIdentity,
    factory: Factory,
}

impl ActorClass {
    /// Wraps an async constructor.
    ///
    /// The returned future is awaited inside the host's blocking initializer, so any
    /// async setup it performs settles before the first call reaches the instance.
    pub fn new<A, F, Fut>(name: impl Into<String>, constructor: F) -> Self
    where
        A: DurableActor,
        F: Fn(ActorState, Env) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, ActorError>> + Send + 'static,
    {
        let factory: Factory = Arc::new(move |state, env| {
            let pending = constructor(state, env);
            async move {
                let actor = pending.await?;
                Ok(LiveInstance::new(Arc::new(actor)))
            }
            .boxed()
        });
        Self {
            name: name.into(),
            identity: ClassIdentity::next(),
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> ClassIdentity {
        self.identity
    }

    pub(crate) fn construct(
        &self,
        state: ActorState,
        env: Env,
    ) -> BoxFuture<'static, Result<LiveInstance, ActorError>> {
        (self.factory)(state, env)
    }
}

impl fmt::Debug for ActorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorClass")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .finish()
    }
}

/// A constructed user actor.
#[derive(Clone)]
pub struct LiveInstance {
    hooks: Arc<dyn DurableActor>,
    any: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl LiveInstance {
    pub fn new<A: DurableActor>(actor: Arc<A>) -> Self {
        Self {
            hooks: actor.clone(),
            any: actor,
            type_name: std::any::type_name::<A>(),
        }
    }

    pub fn hooks(&self) -> &Arc<dyn DurableActor> {
        &self.hooks
    }

    pub fn as_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.any.clone()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Typed handle to the instance, if it is a `T`.
    pub fn downcast<T: DurableActor>(&self) -> Option<Arc<T>> {
        self.any.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for LiveInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveInstance")
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl DurableActor for Silent {}

    struct Other;

    impl DurableActor for Other {}

    #[test]
    fn test_each_class_gets_a_new_identity() {
        let a = ActorClass::new("Silent", |_, _| async { Ok::<_, ActorError>(Silent) });
        let b = ActorClass::new("Silent", |_, _| async { Ok::<_, ActorError>(Silent) });
        assert_ne!(a.identity(), b.identity());
        assert_eq!(a.clone().identity(), a.identity());
    }

    #[test]
    fn test_live_instance_downcast() {
        let instance = LiveInstance::new(Arc::new(Silent));
        assert!(instance.downcast::<Silent>().is_some());
        assert!(instance.downcast::<Other>().is_none());
        assert!(instance.type_name().ends_with("Silent"));
    }

    #[tokio::test]
    async fn test_default_hooks() {
        let actor = Silent;
        let err = actor.fetch(Request::get("http://x/")).await.unwrap_err();
        assert!(matches!(
            HarnessError::from_hook_error(err),
            HarnessError::HandlerNotImplemented { hook: "fetch" }
        ));
        assert!(actor.alarm().await.is_ok());
        assert!(actor.web_socket_error("x".into()).await.is_ok());
    }
}
