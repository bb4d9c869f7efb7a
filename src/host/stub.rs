//! # Actor Stubs
//!
//! An [`ActorStub`] is an address-only handle to one actor host. It forwards
//! [`Call`]s over the host's `mpsc` channel and awaits the reply on a `oneshot`
//! channel. Stubs are cheap to clone and can be shared across tasks.

use crate::error::{HarnessError, Result};
use crate::id::ActorId;
use crate::host::AbortSignal;
use crate::transport::{Call, Event, Request, Response, WebSocketMessage};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// One-shot channel the host replies on.
pub type Reply = oneshot::Sender<Result<Response>>;

/// A call in flight to an actor host.
#[derive(Debug)]
pub struct Envelope {
    pub call: Call,
    pub respond_to: Reply,
}

/// Handle to one actor.
#[derive(Clone)]
pub struct ActorStub {
    id: ActorId,
    sender: mpsc::Sender<Envelope>,
    abort: AbortSignal,
}

impl ActorStub {
    pub(crate) fn new(id: ActorId, sender: mpsc::Sender<Envelope>, abort: AbortSignal) -> Self {
        Self { id, sender, abort }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Whether the host behind this stub was aborted.
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Whether the host task behind this stub has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends a raw transport call.
    pub async fn call(&self, call: Call) -> Result<Response> {
        debug!(actor_id = %self.id, hook = call.event.hook_name(), action = call.metadata.is_some(), "Sending call");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(Envelope { call, respond_to })
            .await
            .map_err(|_| HarnessError::ActorClosed)?;
        response.await.map_err(|_| HarnessError::ActorDropped)?
    }

    pub async fn fetch(&self, request: Request) -> Result<Response> {
        self.call(Call::event(Event::Fetch(request))).await
    }

    /// Delivers an alarm event as the scheduler would, without touching the schedule.
    pub async fn alarm(&self) -> Result<()> {
        self.call(Call::event(Event::Alarm)).await.map(|_| ())
    }

    pub async fn web_socket_message(&self, message: WebSocketMessage) -> Result<()> {
        self.call(Call::event(Event::WebSocketMessage(message)))
            .await
            .map(|_| ())
    }

    pub async fn web_socket_close(&self, code: u16, reason: impl Into<String>, was_clean: bool) -> Result<()> {
        self.call(Call::event(Event::WebSocketClose {
            code,
            reason: reason.into(),
            was_clean,
        }))
        .await
        .map(|_| ())
    }

    pub async fn web_socket_error(&self, error: impl Into<String>) -> Result<()> {
        self.call(Call::event(Event::WebSocketError(error.into())))
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for ActorStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorStub")
            .field("id", &self.id)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
