//! # Actor Hosts
//!
//! Everything that runs on the actor's side of the channel.
//!
//! - [`ActorHost`]: the per-actor task. Receives every call, runs control actions and
//!   forwards everything else to the user hooks.
//! - [`LifecycleManager`]: builds the user instance once and guards it against hot
//!   reloads.
//! - [`ActorState`]: what user code sees of its host (id, storage, blocking work).
//! - [`ActorStub`]: the address-only handle callers hold.

pub mod dispatcher;
pub mod lifecycle;
pub mod state;
pub mod stub;

pub use dispatcher::{ActorHost, HostParams};
pub use lifecycle::{Lifecycle, LifecycleManager};
pub use state::{AbortSignal, ActorState};
pub use stub::{ActorStub, Envelope, Reply};
