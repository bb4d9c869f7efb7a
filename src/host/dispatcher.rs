//! # Action Dispatcher
//!
//! [`ActorHost`] is the server half of one actor. It owns the actor's
//! [`LifecycleManager`] and the receiving end of its channel, and processes calls
//! strictly one at a time, which is what gives every actor its single-active-operation
//! guarantee.
//!
//! Every call is intercepted before user code sees it:
//!
//! - **With an action descriptor** in the metadata, the host runs the action and leaves
//!   its outcome in the runtime's [`ActionRegistry`]:
//!     * `GetInstance`: stores the live instance, replies `204`.
//!     * `RunCallback`: takes the registered callback and awaits it against the live
//!       instance. A [`Response`] result is stored as `UseTransportResponse` and
//!       returned as the reply itself; any other value is stored, reply `204`.
//!     * `RunAlarm`: if an alarm is scheduled, clears it and runs the `alarm` hook,
//!       storing `true`; otherwise stores `false`. Reply `204`.
//!     * A user error in any of these is stored, reply `500`. Panics in user code
//!       count as user errors.
//! - **Without one**, the call is forwarded to the matching hook unchanged and the
//!   hook's result (or error) is the reply.
//!
//! Between calls the host also sleeps until the stored alarm time, if any, and then
//! runs the alarm hook on its own.
//!
//! A panic that escapes a call aborts the host. The caller gets
//! [`HarnessError::Aborted`] and the namespace starts a replacement on the next `get`.

use crate::clients::{ActionRegistry, Outcome};
use crate::error::{catch_panic, HarnessError, Panicked, Result};
use crate::host::{AbortSignal, ActorState, ActorStub, Envelope, LifecycleManager};
use crate::id::ActorId;
use crate::module::ModuleLoader;
use crate::runtime::Env;
use crate::storage::ActorStorage;
use crate::transport::{Action, ActionId, Call, Event, Response};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Everything needed to start a host.
pub struct HostParams {
    pub id: ActorId,
    pub class_name: String,
    pub storage: Arc<dyn ActorStorage>,
    pub loader: Arc<dyn ModuleLoader>,
    pub env: Env,
    pub actions: Arc<ActionRegistry>,
    pub mailbox_capacity: usize,
}

/// The host task of one actor.
pub struct ActorHost {
    receiver: mpsc::Receiver<Envelope>,
    lifecycle: LifecycleManager,
    actions: Arc<ActionRegistry>,
}

impl ActorHost {
    /// Creates a host and the stub addressing it. The host must be run via [`ActorHost::run`].
    pub fn new(params: HostParams) -> (Self, ActorStub) {
        let abort = AbortSignal::default();
        let state = ActorState::new(params.id.clone(), params.storage, abort.clone());
        let lifecycle = LifecycleManager::new(params.class_name, state, params.env, params.loader);
        let (sender, receiver) = mpsc::channel(params.mailbox_capacity);
        let host = Self {
            receiver,
            lifecycle,
            actions: params.actions,
        };
        (host, ActorStub::new(params.id, sender, abort))
    }

    /// Creates a host and spawns it on `handle`.
    pub fn spawn(handle: &Handle, params: HostParams) -> ActorStub {
        let (host, stub) = Self::new(params);
        handle.spawn(host.run());
        stub
    }

    fn state(&self) -> &ActorState {
        self.lifecycle.state()
    }

    /// Runs the host loop until every stub is dropped.
    pub async fn run(mut self) {
        let actor_id = self.state().id().clone();
        info!(%actor_id, "Actor host started");

        loop {
            let deadline = self.next_alarm().await;
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(Envelope { call, respond_to }) => {
                        let reply = match AssertUnwindSafe(self.handle(call)).catch_unwind().await {
                            Ok(reply) => reply,
                            Err(payload) => {
                                let panicked = Panicked::from_payload(payload);
                                warn!(%actor_id, error = %panicked, "Call panicked, aborting actor");
                                self.state().abort_signal().abort(panicked.to_string());
                                Err(HarnessError::Aborted { reason: panicked.to_string() })
                            }
                        };
                        if let Err(e) = &reply {
                            debug!(%actor_id, error = %e, "Call failed");
                        }
                        let _ = respond_to.send(reply);
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.run_scheduled_alarm().await;
                }
            }
        }

        info!(%actor_id, aborted = self.state().is_aborted(), "Actor host shutdown");
    }

    async fn next_alarm(&self) -> Option<Instant> {
        if self.state().is_aborted() {
            return None;
        }
        match self.state().storage().get_alarm().await {
            Ok(Some(at)) => {
                let delay = at
                    .duration_since(SystemTime::now())
                    .unwrap_or(Duration::ZERO);
                Some(Instant::now() + delay)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(actor_id = %self.state().id(), error = %e, "Failed to read alarm");
                None
            }
        }
    }

    async fn run_scheduled_alarm(&mut self) {
        let actor_id = self.state().id().clone();
        if let Err(e) = self.state().storage().delete_alarm().await {
            warn!(%actor_id, error = %e, "Failed to clear alarm");
            return;
        }
        let result = match self.lifecycle.ensure_instance().await {
            Ok(instance) => catch_panic(instance.hooks().alarm())
                .await
                .map_err(HarnessError::user),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => info!(%actor_id, "Scheduled alarm ran"),
            Err(e) => warn!(%actor_id, error = %e, "Scheduled alarm failed"),
        }
    }

    async fn handle(&mut self, call: Call) -> Result<Response> {
        self.state().abort_signal().check()?;
        match call.metadata {
            Some(metadata) => {
                let action = Action::from_metadata(metadata)?;
                self.handle_action(action).await
            }
            None => self.forward(call.event).await,
        }
    }

    async fn handle_action(&mut self, action: Action) -> Result<Response> {
        let id = action.id();
        debug!(actor_id = %self.state().id(), action_id = id, kind = action.kind(), "Action");

        let result = match action {
            Action::GetInstance { .. } => self.get_instance(id).await,
            Action::RunCallback { .. } => self.run_callback(id).await,
            Action::RunAlarm { .. } => self.run_alarm(id).await,
        };

        match result {
            Err(HarnessError::UserCode(e)) => {
                warn!(actor_id = %self.state().id(), action_id = id, error = %e, "Action failed");
                self.actions.put_outcome(id, Outcome::Error(e))?;
                Ok(Response::internal_error())
            }
            other => other,
        }
    }

    async fn get_instance(&mut self, id: ActionId) -> Result<Response> {
        let instance = self.lifecycle.ensure_instance().await?;
        self.actions
            .put_outcome(id, Outcome::Instance(instance.as_any()))?;
        Ok(Response::no_content())
    }

    async fn run_callback(&mut self, id: ActionId) -> Result<Response> {
        let callback = self.actions.take_callback(id)?;
        let instance = self.lifecycle.ensure_instance().await?;
        let value = match AssertUnwindSafe(callback(instance, self.state().clone()))
            .catch_unwind()
            .await
        {
            Ok(result) => result?,
            Err(payload) => {
                return Err(HarnessError::user(Box::new(Panicked::from_payload(payload))))
            }
        };

        if value.is::<()>() {
            self.actions.put_outcome(id, Outcome::Undefined)?;
            return Ok(Response::no_content());
        }
        // Responses go back as the reply itself rather than through the registry.
        match value.downcast::<Response>() {
            Ok(response) => {
                self.actions.put_outcome(id, Outcome::UseTransportResponse)?;
                Ok(*response)
            }
            Err(value) => {
                self.actions.put_outcome(id, Outcome::Value(value))?;
                Ok(Response::no_content())
            }
        }
    }

    async fn run_alarm(&mut self, id: ActionId) -> Result<Response> {
        let instance = self.lifecycle.ensure_instance().await?;
        let storage = self.state().storage().clone();

        let ran = match storage.get_alarm().await? {
            None => false,
            Some(_) => {
                storage.delete_alarm().await?;
                catch_panic(instance.hooks().alarm())
                    .await
                    .map_err(HarnessError::user)?;
                true
            }
        };
        self.actions.put_outcome(id, Outcome::Value(Box::new(ran)))?;
        Ok(Response::no_content())
    }

    async fn forward(&mut self, event: Event) -> Result<Response> {
        let instance = self.lifecycle.ensure_instance().await?;
        let hooks = instance.hooks();
        let result = match event {
            Event::Fetch(request) => {
                return catch_panic(hooks.fetch(request))
                    .await
                    .map_err(HarnessError::from_hook_error)
            }
            Event::Alarm => catch_panic(hooks.alarm()).await,
            Event::WebSocketMessage(message) => catch_panic(hooks.web_socket_message(message)).await,
            Event::WebSocketClose {
                code,
                reason,
                was_clean,
            } => catch_panic(hooks.web_socket_close(code, reason, was_clean)).await,
            Event::WebSocketError(error) => catch_panic(hooks.web_socket_error(error)).await,
        };
        result
            .map(|()| Response::no_content())
            .map_err(HarnessError::from_hook_error)
    }
}
