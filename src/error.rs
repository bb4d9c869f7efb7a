//! # Harness Errors
//!
//! This module defines the error type shared by every layer of the harness: the test
//! client, the action dispatcher, the lifecycle manager and the collaborator seams.
//!
//! Errors fall into four families:
//!
//! - **Usage**: the caller did something the harness cannot honour (cross-isolate
//!   reference, reading an action outcome twice, a required hook that does not exist).
//! - **Stale source**: the actor class changed underneath a warm actor and the host was
//!   aborted. Subsequent calls to that host report [`HarnessError::Aborted`].
//! - **User code**: anything thrown (or panicked) by the wrapped actor or by a test
//!   callback. The boxed error travels untouched, even when user code returned a boxed
//!   `HarnessError`, so callers get back the very same value.
//! - **Protocol**: a malformed or unknown action descriptor reached a host.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Error type produced by user actor hooks, constructors and test callbacks.
pub type ActorError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur within the harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("{0}")]
    Usage(String),

    #[error("Handler does not export a {hook}() handler")]
    HandlerNotImplemented { hook: &'static str },

    #[error("Source of actor class {class_name} changed while the actor was running; use a fresh reference")]
    StaleSource { class_name: String },

    #[error("Actor host aborted: {reason}")]
    Aborted { reason: String },

    #[error(transparent)]
    UserCode(ActorError),

    #[error("Invalid action descriptor: {0}")]
    Protocol(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Actor closed")]
    ActorClosed,

    #[error("Actor dropped response channel")]
    ActorDropped,
}

impl HarnessError {
    /// Wraps an error raised by user code. The boxed value is kept as is, even when it
    /// is itself a `HarnessError`, so callers can recover the very same allocation.
    pub fn user(error: ActorError) -> Self {
        HarnessError::UserCode(error)
    }

    /// Converts the error of an ordinary hook.
    ///
    /// The default `fetch` signals a missing handler with a boxed
    /// [`HarnessError::HandlerNotImplemented`]; that one is unboxed. Anything else is
    /// user code.
    pub fn from_hook_error(error: ActorError) -> Self {
        if let Some(HarnessError::HandlerNotImplemented { hook }) =
            error.downcast_ref::<HarnessError>()
        {
            return HarnessError::HandlerNotImplemented { hook: *hook };
        }
        HarnessError::UserCode(error)
    }

    /// Returns the user error, if this error came from user code.
    pub fn into_user_error(self) -> Option<ActorError> {
        match self {
            HarnessError::UserCode(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            HarnessError::Usage(_) | HarnessError::HandlerNotImplemented { .. }
        )
    }
}

/// A panic caught while running user code.
#[derive(Debug, thiserror::Error)]
#[error("Actor code panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => message.to_string(),
                Err(_) => "unknown panic payload".to_string(),
            },
        };
        Self { message }
    }
}

/// Awaits user code, turning a panic into a [`Panicked`] error.
pub async fn catch_panic<T, F>(work: F) -> std::result::Result<T, ActorError>
where
    F: Future<Output = std::result::Result<T, ActorError>>,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Box::new(Panicked::from_payload(payload)) as ActorError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_from_hook_error_unboxes_missing_handler() {
        let boxed: ActorError = Box::new(HarnessError::HandlerNotImplemented { hook: "fetch" });
        let err = HarnessError::from_hook_error(boxed);
        assert!(matches!(
            err,
            HarnessError::HandlerNotImplemented { hook: "fetch" }
        ));
        assert!(err.is_usage());
    }

    #[test]
    fn test_from_hook_error_wraps_user_errors() {
        let err = HarnessError::from_hook_error(Box::new(Boom));
        assert_eq!(err.to_string(), "boom");
        let inner = err.into_user_error().unwrap();
        assert!(inner.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn test_user_keeps_boxed_harness_errors() {
        let boxed: ActorError = Box::new(HarnessError::Storage("disk full".into()));
        let address = &*boxed as *const _ as *const () as usize;

        let err = HarnessError::user(boxed);
        assert!(matches!(err, HarnessError::UserCode(_)));
        let inner = err.into_user_error().unwrap();
        assert_eq!(&*inner as *const _ as *const () as usize, address);
        assert!(matches!(
            inner.downcast_ref::<HarnessError>(),
            Some(HarnessError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_catch_panic() {
        let ok = catch_panic(async { Ok::<_, ActorError>(1) }).await.unwrap();
        assert_eq!(ok, 1);

        let err = catch_panic(async {
            if ok == 1 {
                panic!("counter went negative");
            }
            Ok::<u32, ActorError>(0)
        })
        .await
        .unwrap_err();
        let panicked = err.downcast::<Panicked>().unwrap();
        assert_eq!(panicked.message, "counter went negative");
    }
}
