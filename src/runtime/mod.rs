//! # Runtime
//!
//! Isolates and the plumbing around them.
//!
//! - [`Runtime`] / [`RuntimeBuilder`] / [`Env`]: one isolate, built from configuration.
//! - [`ActorNamespace`]: mints ids for one actor class and starts hosts.
//! - [`setup_tracing`]: logging for tests and tools.

pub mod isolate;
pub mod namespace;
pub mod tracing;

pub(crate) use isolate::RuntimeInner;
pub use isolate::{Env, Runtime, RuntimeBuilder};
pub use namespace::ActorNamespace;
pub use self::tracing::setup_tracing;
