//! # Same-Isolate Validator
//!
//! Test helpers reach into an actor's live instance, which only works when the actor
//! runs in the same isolate as the test. A stub is local when one of the runtime's
//! same-isolate namespaces can reconstruct an id from the stub's serialized id.

use crate::error::{HarnessError, Result};
use crate::runtime::Runtime;
use crate::host::ActorStub;
use tracing::debug;

/// Whether `stub` addresses an actor hosted by `runtime`.
pub fn is_same_isolate(runtime: &Runtime, stub: &ActorStub) -> bool {
    let id = stub.id().to_string();
    runtime
        .same_isolate_namespaces()
        .iter()
        .any(|namespace| namespace.id_from_string(&id).is_ok())
}

/// Fails with a usage error unless `stub` addresses an actor hosted by `runtime`.
pub fn ensure_same_isolate(runtime: &Runtime, stub: &ActorStub) -> Result<()> {
    if is_same_isolate(runtime, stub) {
        return Ok(());
    }
    debug!(actor_id = %stub.id(), isolate_id = %runtime.isolate_id(), "Rejected foreign stub");
    Err(HarnessError::Usage(
        "Actor test helpers can only be used with stubs pointing to actors hosted in the same isolate"
            .into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::module::StaticModuleLoader;
    use std::sync::Arc;

    fn runtime(config: HarnessConfig) -> Runtime {
        Runtime::builder(Arc::new(StaticModuleLoader::new("worker")))
            .config(config)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_stub_accepted_in_any_local_namespace() {
        let runtime = runtime(
            HarnessConfig::new()
                .with_namespace("A", "Alpha")
                .with_namespace("B", "Beta"),
        );
        let stub = runtime.namespace("B").unwrap().get_by_name("x").unwrap();
        assert!(ensure_same_isolate(&runtime, &stub).is_ok());
    }

    #[tokio::test]
    async fn test_stub_from_other_runtime_rejected() {
        let local = runtime(
            HarnessConfig::new()
                .with_namespace("A", "Alpha")
                .with_external_namespace("R", "Remote"),
        );
        let remote = runtime(HarnessConfig::new().with_namespace("R", "Remote"));
        local
            .link_external("R", remote.namespace("R").unwrap())
            .unwrap();

        let stub = local.namespace("R").unwrap().get_by_name("x").unwrap();
        let err = ensure_same_isolate(&local, &stub).unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().contains("same isolate"));
        assert!(is_same_isolate(&remote, &stub));
    }
}
