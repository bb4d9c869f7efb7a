//! # Observability & Tracing
//!
//! The harness logs through the `tracing` crate with structured fields (`actor_id`,
//! `action_id`, `class_name`). [`setup_tracing`] installs a compact subscriber
//! filtered by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Runtime and hosts**: runtime start, host start and shutdown, host replacement
//! - **Lifecycle**: instance construction, class changes underneath warm actors
//! - **Actions**: each action and its stored outcome (`debug`), user errors (`warn`)
//! - **Client operations**: one span per `get_instance`, `run_with_context` and
//!   `run_alarm` call
//!
//! ```bash
//! RUST_LOG=info cargo test
//! RUST_LOG=debug cargo test -- --nocapture
//! ```
//!
//! With `RUST_LOG=debug` a `run_with_context` call looks like:
//!
//! ```text
//! DEBUG run_with_context: Sending call actor_id=5c1e.. hook="fetch" action=true
//! DEBUG Action actor_id=5c1e.. action_id=3 kind="RunCallback"
//! DEBUG Outcome stored action_id=3 outcome="value"
//! DEBUG run_with_context: Action replied action_id=3 status=204
//! ```

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
