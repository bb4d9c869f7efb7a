//! # Test-Driver Client
//!
//! [`TestClient`] is what tests use to reach into an actor. Every operation follows
//! the same pattern:
//!
//! 1. Check the stub addresses an actor of this isolate.
//! 2. Allocate an action id, and register the callback for `run_with_context`.
//! 3. Send a call carrying the action descriptor and await the reply.
//! 4. Take the outcome the host left under the id; re-raise a stored user error.
//!
//! ```rust,ignore
//! let client = runtime.client();
//! let stub = runtime.namespace("COUNTER")?.get_by_name("a")?;
//!
//! let counter: Arc<Counter> = client.get_instance(&stub).await?;
//! let count = client
//!     .run_with_context(&stub, |counter: Arc<Counter>, state| async move {
//!         counter.count(&state).await
//!     })
//!     .await?;
//! let ran = client.run_alarm(&stub).await?;
//! ```

use crate::actor::{DurableActor, LiveInstance};
use crate::clients::{ensure_same_isolate, ContextCallback, Outcome};
use crate::error::{ActorError, HarnessError, Result};
use crate::host::{ActorState, ActorStub};
use crate::id::ActorId;
use crate::runtime::{ActorNamespace, Runtime};
use crate::transport::{Action, Call, Response};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Drives actors of one runtime from test code.
#[derive(Clone, Debug)]
pub struct TestClient {
    runtime: Runtime,
}

impl TestClient {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Returns the live instance behind `stub`, constructing it if needed.
    #[instrument(skip(self, stub), fields(actor_id = %stub.id()))]
    pub async fn get_instance<T: DurableActor>(&self, stub: &ActorStub) -> Result<Arc<T>> {
        ensure_same_isolate(&self.runtime, stub)?;
        let id = self.runtime.actions().allocate();

        let (_, outcome) = self.issue(stub, Action::GetInstance { id }).await?;
        match outcome {
            Outcome::Instance(instance) => instance.downcast::<T>().map_err(|_| {
                HarnessError::Usage(format!(
                    "Actor {} is not a {}",
                    stub.id(),
                    std::any::type_name::<T>()
                ))
            }),
            other => Err(unexpected("GetInstance", &other)),
        }
    }

    /// Runs `f` inside the actor's execution context, serialized with every other call
    /// to that actor.
    ///
    /// If `f` produces a [`Response`], it travels back as the raw reply.
    #[instrument(skip(self, stub, f), fields(actor_id = %stub.id()))]
    pub async fn run_with_context<T, R, F, Fut>(&self, stub: &ActorStub, f: F) -> Result<R>
    where
        T: DurableActor,
        R: Send + 'static,
        F: FnOnce(Arc<T>, ActorState) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<R, ActorError>> + Send + 'static,
    {
        ensure_same_isolate(&self.runtime, stub)?;
        let actions = self.runtime.actions();
        let id = actions.allocate();

        let callback: ContextCallback = Box::new(move |instance: LiveInstance, state: ActorState| {
            async move {
                let actor = instance.downcast::<T>().ok_or_else(|| {
                    HarnessError::Usage(format!(
                        "Actor is a {}, not a {}",
                        instance.type_name(),
                        std::any::type_name::<T>()
                    ))
                })?;
                let value = f(actor, state).await.map_err(HarnessError::user)?;
                Ok::<_, HarnessError>(Box::new(value) as Box<dyn Any + Send>)
            }
            .boxed()
        });
        actions.register_callback(id, callback)?;

        let (response, outcome) = self.issue(stub, Action::RunCallback { id }).await?;
        let value: Box<dyn Any + Send> = match outcome {
            Outcome::Value(value) => value,
            Outcome::UseTransportResponse => Box::new(response),
            Outcome::Undefined => Box::new(()),
            other => return Err(unexpected("RunCallback", &other)),
        };
        value.downcast::<R>().map(|value| *value).map_err(|_| {
            HarnessError::Usage(format!(
                "Callback result is not a {}",
                std::any::type_name::<R>()
            ))
        })
    }

    /// Runs the actor's alarm if one is scheduled. Returns whether it ran.
    #[instrument(skip(self, stub), fields(actor_id = %stub.id()))]
    pub async fn run_alarm(&self, stub: &ActorStub) -> Result<bool> {
        ensure_same_isolate(&self.runtime, stub)?;
        let id = self.runtime.actions().allocate();

        let (_, outcome) = self.issue(stub, Action::RunAlarm { id }).await?;
        match outcome {
            Outcome::Value(value) => value.downcast::<bool>().map(|ran| *ran).map_err(|_| {
                HarnessError::Usage("RunAlarm produced a non-boolean outcome".into())
            }),
            other => Err(unexpected("RunAlarm", &other)),
        }
    }

    /// Ids of every actor started in `namespace`.
    pub fn list_actor_ids(&self, namespace: &ActorNamespace) -> Vec<ActorId> {
        namespace.ids()
    }

    async fn issue(&self, stub: &ActorStub, action: Action) -> Result<(Response, Outcome)> {
        let id = action.id();
        let actions = self.runtime.actions();

        let response = match stub.call(Call::action(action)).await {
            Ok(response) => response,
            Err(e) => {
                actions.discard(id);
                return Err(e);
            }
        };
        debug!(action_id = id, status = response.status, "Action replied");

        match actions.take_outcome(id)? {
            Outcome::Error(e) => Err(HarnessError::UserCode(e)),
            outcome => Ok((response, outcome)),
        }
    }
}

fn unexpected(action: &str, outcome: &Outcome) -> HarnessError {
    HarnessError::Usage(format!("{} produced an unexpected outcome {:?}", action, outcome))
}
