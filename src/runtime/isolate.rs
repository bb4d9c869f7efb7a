//! # Isolates
//!
//! A [`Runtime`] is one isolate: it owns the resolved configuration, the module loader,
//! the storage provider, the shared [`ActionRegistry`] and one [`ActorNamespace`] per
//! configured binding.
//!
//! ## Example
//!
//! ```rust,ignore
//! let loader = StaticModuleLoader::new("worker").define("worker", || {
//!     Module::new("worker").with_class(ActorClass::new("Counter", Counter::new))
//! });
//! let runtime = Runtime::builder(Arc::new(loader))
//!     .config(HarnessConfig::new().with_namespace("COUNTER", "Counter"))
//!     .build()?;
//!
//! let counter = runtime.namespace("COUNTER")?;
//! let stub = counter.get_by_name("a")?;
//! let response = stub.fetch(Request::get("http://x/increment")).await?;
//! ```
//!
//! Actors see the runtime through [`Env`], which only holds a weak reference, so hosts
//! never keep their runtime alive.

use crate::clients::{ActionRegistry, TestClient};
use crate::config::{ConfigResolver, HarnessConfig, StaticConfig};
use crate::error::{HarnessError, Result};
use crate::module::ModuleLoader;
use crate::runtime::ActorNamespace;
use crate::storage::{MemoryStorageProvider, StorageProvider};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, info};
use uuid::Uuid;

pub(crate) struct RuntimeInner {
    isolate_id: Uuid,
    config: HarnessConfig,
    vars: Arc<BTreeMap<String, serde_json::Value>>,
    pub(crate) loader: Arc<dyn ModuleLoader>,
    pub(crate) storage: Arc<dyn StorageProvider>,
    pub(crate) actions: Arc<ActionRegistry>,
    namespaces: HashMap<String, ActorNamespace>,
    external: Mutex<HashMap<String, ActorNamespace>>,
    same_isolate: OnceLock<Vec<String>>,
    weak_self: Weak<RuntimeInner>,
}

impl RuntimeInner {
    pub(crate) fn mailbox_capacity(&self) -> usize {
        self.config.mailbox_capacity
    }

    pub(crate) fn env(&self) -> Env {
        Env {
            runtime: self.weak_self.clone(),
            vars: self.vars.clone(),
        }
    }

    fn namespace(&self, binding: &str) -> Result<ActorNamespace> {
        if let Some(namespace) = self.namespaces.get(binding) {
            return Ok(namespace.clone());
        }
        if let Some(namespace) = self.external.lock().get(binding) {
            return Ok(namespace.clone());
        }
        match self.config.namespaces.iter().find(|ns| ns.binding == binding) {
            Some(_) => Err(HarnessError::Usage(format!(
                "Namespace {} is hosted by another isolate and has not been linked",
                binding
            ))),
            None => Err(HarnessError::Usage(format!(
                "No actor namespace is bound as {}",
                binding
            ))),
        }
    }
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        self.actions.teardown();
        debug!(isolate_id = %self.isolate_id, "Runtime dropped");
    }
}

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    loader: Arc<dyn ModuleLoader>,
    resolver: Box<dyn ConfigResolver>,
    storage: Option<Arc<dyn StorageProvider>>,
}

impl RuntimeBuilder {
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.resolver = Box::new(StaticConfig::new(config));
        self
    }

    pub fn config_resolver(mut self, resolver: impl ConfigResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Overrides the default in-memory storage.
    pub fn storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<Runtime> {
        let config = self.resolver.resolve()?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorageProvider::new()));
        let isolate_id = Uuid::new_v4();

        let inner = Arc::new_cyclic(|weak: &Weak<RuntimeInner>| {
            let namespaces = config
                .namespaces
                .iter()
                .filter(|ns| ns.same_isolate)
                .map(|ns| {
                    (
                        ns.binding.clone(),
                        ActorNamespace::new(&ns.binding, &ns.class_name, weak.clone()),
                    )
                })
                .collect();
            RuntimeInner {
                isolate_id,
                vars: Arc::new(config.vars.clone()),
                config,
                loader: self.loader,
                storage,
                actions: Arc::new(ActionRegistry::new()),
                namespaces,
                external: Mutex::new(HashMap::new()),
                same_isolate: OnceLock::new(),
                weak_self: weak.clone(),
            }
        });

        info!(
            isolate_id = %isolate_id,
            namespaces = inner.namespaces.len(),
            "Runtime started"
        );
        Ok(Runtime { inner })
    }
}

/// Handle to one isolate. Cheap to clone.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    pub fn builder(loader: Arc<dyn ModuleLoader>) -> RuntimeBuilder {
        RuntimeBuilder {
            loader,
            resolver: Box::new(StaticConfig::new(HarnessConfig::new())),
            storage: None,
        }
    }

    pub fn isolate_id(&self) -> Uuid {
        self.inner.isolate_id
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.inner.config
    }

    /// The namespace bound as `binding`, local or linked.
    pub fn namespace(&self, binding: &str) -> Result<ActorNamespace> {
        self.inner.namespace(binding)
    }

    /// The environment actors of this runtime are constructed with.
    pub fn env(&self) -> Env {
        self.inner.env()
    }

    /// Namespaces hosted by this isolate, in declaration order.
    ///
    /// The binding list is derived from the configuration on first use and cached for
    /// the lifetime of the runtime.
    pub fn same_isolate_namespaces(&self) -> Vec<ActorNamespace> {
        self.inner
            .same_isolate
            .get_or_init(|| self.inner.config.same_isolate_bindings())
            .iter()
            .filter_map(|binding| self.inner.namespaces.get(binding).cloned())
            .collect()
    }

    pub fn actions(&self) -> &Arc<ActionRegistry> {
        &self.inner.actions
    }

    /// Drops every pending callback and unread outcome. Call between test runs.
    pub fn reset_actions(&self) {
        self.inner.actions.teardown();
    }

    /// Binds a namespace owned by another runtime under a binding this runtime
    /// declared as external.
    pub fn link_external(&self, binding: &str, namespace: ActorNamespace) -> Result<()> {
        let declared = self
            .inner
            .config
            .namespaces
            .iter()
            .any(|ns| ns.binding == binding && !ns.same_isolate);
        if !declared {
            return Err(HarnessError::Config(format!(
                "{} is not declared as an external namespace",
                binding
            )));
        }
        info!(binding, class_name = namespace.class_name(), "External namespace linked");
        self.inner
            .external
            .lock()
            .insert(binding.to_string(), namespace);
        Ok(())
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(self.clone())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("isolate_id", &self.inner.isolate_id)
            .finish()
    }
}

/// What an actor sees of its runtime: namespace bindings and plain variables.
#[derive(Clone)]
pub struct Env {
    runtime: Weak<RuntimeInner>,
    vars: Arc<BTreeMap<String, serde_json::Value>>,
}

impl Env {
    /// An environment bound to no runtime. Namespace lookups fail.
    pub fn detached() -> Self {
        Self {
            runtime: Weak::new(),
            vars: Arc::new(BTreeMap::new()),
        }
    }

    pub fn namespace(&self, binding: &str) -> Result<ActorNamespace> {
        let runtime = self.runtime.upgrade().ok_or_else(|| {
            HarnessError::Usage("Environment is not attached to a running runtime".into())
        })?;
        runtime.namespace(binding)
    }

    pub fn var(&self, name: &str) -> Option<&serde_json::Value> {
        self.vars.get(name)
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("attached", &(self.runtime.strong_count() > 0))
            .field("vars", &self.vars)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::StaticModuleLoader;

    fn loader() -> Arc<dyn ModuleLoader> {
        Arc::new(StaticModuleLoader::new("worker"))
    }

    #[test]
    fn test_same_isolate_namespaces_follow_declaration_order() {
        let runtime = Runtime::builder(loader())
            .config(
                HarnessConfig::new()
                    .with_namespace("B", "Beta")
                    .with_external_namespace("R", "Remote")
                    .with_namespace("A", "Alpha"),
            )
            .build()
            .unwrap();

        let bindings: Vec<String> = runtime
            .same_isolate_namespaces()
            .iter()
            .map(|ns| ns.binding().to_string())
            .collect();
        assert_eq!(bindings, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_unknown_and_unlinked_bindings() {
        let runtime = Runtime::builder(loader())
            .config(HarnessConfig::new().with_external_namespace("R", "Remote"))
            .build()
            .unwrap();

        assert!(runtime.namespace("MISSING").unwrap_err().is_usage());
        let err = runtime.namespace("R").unwrap_err();
        assert!(err.to_string().contains("has not been linked"));
    }

    #[test]
    fn test_link_external_requires_declaration() {
        let other = Runtime::builder(loader())
            .config(HarnessConfig::new().with_namespace("R", "Remote"))
            .build()
            .unwrap();
        let runtime = Runtime::builder(loader())
            .config(HarnessConfig::new().with_external_namespace("R", "Remote"))
            .build()
            .unwrap();

        let remote = other.namespace("R").unwrap();
        assert!(runtime.link_external("X", remote.clone()).is_err());
        runtime.link_external("R", remote).unwrap();
        assert_eq!(runtime.namespace("R").unwrap().class_name(), "Remote");
    }

    #[test]
    fn test_env_vars_and_detached_lookup() {
        let runtime = Runtime::builder(loader())
            .config(HarnessConfig::new().with_var("GREETING", "hello"))
            .build()
            .unwrap();

        let env = runtime.env();
        assert_eq!(env.var("GREETING"), Some(&serde_json::json!("hello")));
        assert!(Env::detached().namespace("COUNTER").unwrap_err().is_usage());
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let result = Runtime::builder(loader())
            .config(HarnessConfig::new().with_namespace("", "Counter"))
            .build();
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }
}
