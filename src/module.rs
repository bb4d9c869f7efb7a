//! # Module Loading
//!
//! The lifecycle manager resolves actor classes through the [`ModuleLoader`] seam: it
//! asks for the single authoritative user module path, imports it, and looks the class
//! up by export name.
//!
//! [`StaticModuleLoader`] serves modules from in-process sources. Imports are memoized
//! per path, so calling `import_module` redundantly is cheap and always yields the same
//! [`ActorClass`] identities. [`StaticModuleLoader::reload`] swaps a source and drops the
//! memoized module, which is how a hot reload looks to the harness: the next import
//! evaluates the new source and produces new class identities.

use crate::actor::ActorClass;
use crate::error::{HarnessError, Result};
use crate::runtime::Env;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One named export of a module.
#[derive(Debug, Clone)]
pub enum Export {
    Class(ActorClass),
    Value(serde_json::Value),
}

/// An evaluated module.
#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    exports: HashMap<String, Export>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            exports: HashMap::new(),
        }
    }

    /// Exports a class under its own name.
    pub fn with_class(mut self, class: ActorClass) -> Self {
        self.exports
            .insert(class.name().to_string(), Export::Class(class));
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.exports.insert(name.into(), Export::Value(value.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Looks up a constructible class export.
    pub fn class(&self, name: &str) -> Result<&ActorClass> {
        match self.exports.get(name) {
            Some(Export::Class(class)) => Ok(class),
            Some(Export::Value(_)) => Err(HarnessError::Usage(format!(
                "{} exported by {} is not a class and cannot be constructed",
                name, self.path
            ))),
            None => Err(HarnessError::Usage(format!(
                "{} does not export a {} class",
                self.path, name
            ))),
        }
    }
}

/// Loads user modules.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Imports the module at `path`. Implementations memoize per path.
    async fn import_module(&self, env: &Env, path: &str) -> Result<Arc<Module>>;

    /// Path of the single authoritative user module.
    fn main_module_path(&self) -> Result<String>;
}

type ModuleSource = Arc<dyn Fn() -> Module + Send + Sync>;

/// [`ModuleLoader`] over in-process module sources.
pub struct StaticModuleLoader {
    main_module: String,
    sources: Mutex<HashMap<String, ModuleSource>>,
    evaluated: Mutex<HashMap<String, Arc<Module>>>,
}

impl StaticModuleLoader {
    pub fn new(main_module: impl Into<String>) -> Self {
        Self {
            main_module: main_module.into(),
            sources: Mutex::new(HashMap::new()),
            evaluated: Mutex::new(HashMap::new()),
        }
    }

    /// Registers the source of a module. The closure runs on first import.
    pub fn define(
        self,
        path: impl Into<String>,
        source: impl Fn() -> Module + Send + Sync + 'static,
    ) -> Self {
        self.sources.lock().insert(path.into(), Arc::new(source));
        self
    }

    /// Replaces a module's source and forgets its evaluated form.
    pub fn reload(&self, path: &str, source: impl Fn() -> Module + Send + Sync + 'static) {
        self.sources.lock().insert(path.to_string(), Arc::new(source));
        self.evaluated.lock().remove(path);
        info!(path, "Module reloaded");
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn import_module(&self, _env: &Env, path: &str) -> Result<Arc<Module>> {
        if let Some(module) = self.evaluated.lock().get(path) {
            return Ok(module.clone());
        }
        let source = self
            .sources
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| HarnessError::Usage(format!("No such module: {}", path)))?;

        let module = Arc::new(source());
        debug!(path, "Module evaluated");
        // A concurrent import may have finished first; keep whichever landed.
        let mut evaluated = self.evaluated.lock();
        Ok(evaluated
            .entry(path.to_string())
            .or_insert(module)
            .clone())
    }

    fn main_module_path(&self) -> Result<String> {
        if self.main_module.is_empty() {
            return Err(HarnessError::Config("main module path is empty".into()));
        }
        Ok(self.main_module.clone())
    }
}
