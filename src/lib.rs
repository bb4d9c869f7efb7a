//! # Actor Harness
//!
//! > **Reach inside running actors from your tests.**
//!
//! This crate hosts stateful, single-threaded actors the way a production runtime
//! would (one task per actor, calls processed one at a time, durable storage, a
//! scheduled alarm) and adds the hooks a test needs on top:
//!
//! - [`TestClient::get_instance`]: a typed handle to the live actor object.
//! - [`TestClient::run_with_context`]: run a closure inside the actor's execution
//!   context, serialized with every other call to that actor.
//! - [`TestClient::run_alarm`]: fire a scheduled alarm right now.
//!
//! ## Architecture
//!
//! ```text
//! TestClient ──► validator ──► ActionRegistry (callback in)
//!     │
//!     └── Call { metadata: {"type":"RunCallback","id":7} } ──► ActorHost (one task per actor)
//!                                                                 │
//!                                          LifecycleManager ◄─────┤
//!                                                                 ▼
//!                                                ActionRegistry (outcome out) ──► TestClient
//! ```
//!
//! - Only the action id crosses the channel. Callbacks, values, live instances and
//!   errors stay in the runtime's [`ActionRegistry`](clients::ActionRegistry).
//! - Calls without an action descriptor go straight to the actor's hooks, so a stub
//!   behaves exactly like it would without the harness.
//! - Every host guards its instance with a [`LifecycleManager`](host::LifecycleManager):
//!   the instance is built once, and if the actor's class changes underneath it (a
//!   hot reload) the host aborts instead of serving a stale object.
//!
//! ## Module Tour
//!
//! - [`runtime`]: isolates, namespaces and id minting, plus [`setup_tracing`](runtime::setup_tracing).
//! - [`host`]: the per-actor host loop, the lifecycle guard and actor state.
//! - [`clients`]: the test client, the same-isolate validator and the action registry.
//! - [`actor`], [`module`]: user classes and how they are exported and loaded.
//! - [`storage`], [`config`], [`transport`], [`id`], [`error`]: supporting pieces.
//!
//! ## Running Tests
//!
//! ```bash
//! RUST_LOG=debug cargo test
//! ```

pub mod actor;
pub mod clients;
pub mod config;
pub mod error;
pub mod host;
pub mod id;
pub mod module;
pub mod runtime;
pub mod storage;
pub mod transport;

pub use actor::{ActorClass, ClassIdentity, DurableActor, LiveInstance};
pub use clients::TestClient;
pub use config::{ConfigResolver, HarnessConfig, NamespaceConfig, StaticConfig};
pub use error::{ActorError, HarnessError, Result};
pub use host::{ActorState, ActorStub};
pub use id::ActorId;
pub use module::{Module, ModuleLoader, StaticModuleLoader};
pub use runtime::{ActorNamespace, Env, Runtime, RuntimeBuilder};
pub use storage::{ActorStorage, MemoryStorage, MemoryStorageProvider, StorageProvider};
pub use transport::{Request, Response, WebSocketMessage};
