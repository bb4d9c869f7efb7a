//! # Test-Facing Clients
//!
//! The pieces a test touches when it reaches into an actor:
//!
//! - [`TestClient`]: `get_instance`, `run_with_context`, `run_alarm`.
//! - [`validator`]: rejects stubs that point at another isolate.
//! - [`ActionRegistry`]: where callbacks wait and outcomes land, keyed by action id.

pub mod correlation;
pub mod test_client;
pub mod validator;

pub use correlation::{ActionRegistry, ContextCallback, Outcome};
pub use test_client::TestClient;
pub use validator::{ensure_same_isolate, is_same_isolate};
