//! # Configuration
//!
//! The harness reads its static configuration once, through the [`ConfigResolver`] seam.
//! Changing configuration requires building a new [`Runtime`](crate::Runtime), which is
//! what lets the runtime cache values derived from it (such as the same-isolate
//! namespace list) for its whole lifetime.
//!
//! ```toml
//! mailbox_capacity = 32
//!
//! [[namespaces]]
//! binding = "COUNTER"
//! class_name = "Counter"
//!
//! [vars]
//! GREETING = "hello"
//! ```

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_mailbox_capacity() -> usize {
    32
}

fn default_same_isolate() -> bool {
    true
}

/// Resolved harness options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Actor namespace bindings, in declaration order.
    #[serde(default)]
    pub namespaces: Vec<NamespaceConfig>,

    /// Plain variables exposed to actors through [`Env`](crate::Env).
    #[serde(default)]
    pub vars: BTreeMap<String, serde_json::Value>,

    /// Capacity of each actor host's inbound channel.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

/// One actor namespace binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Name the namespace is bound under in the environment.
    pub binding: String,

    /// Name of the exported actor class in the main module.
    pub class_name: String,

    /// Whether actors of this namespace are hosted in this isolate.
    #[serde(default = "default_same_isolate")]
    pub same_isolate: bool,
}

impl NamespaceConfig {
    pub fn new(binding: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            class_name: class_name.into(),
            same_isolate: true,
        }
    }

    /// A binding whose actors are hosted by another isolate.
    pub fn external(binding: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            same_isolate: false,
            ..Self::new(binding, class_name)
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            vars: BTreeMap::new(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }

    /// Adds a namespace binding.
    pub fn with_namespace(mut self, binding: impl Into<String>, class_name: impl Into<String>) -> Self {
        self.namespaces.push(NamespaceConfig::new(binding, class_name));
        self
    }

    /// Adds a binding hosted by another isolate; link it with
    /// [`Runtime::link_external`](crate::Runtime::link_external).
    pub fn with_external_namespace(
        mut self,
        binding: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        self.namespaces.push(NamespaceConfig::external(binding, class_name));
        self
    }

    /// Adds a plain variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(HarnessError::Config(
                "mailbox_capacity must be greater than zero".into(),
            ));
        }
        for (index, ns) in self.namespaces.iter().enumerate() {
            if ns.binding.is_empty() || ns.class_name.is_empty() {
                return Err(HarnessError::Config(format!(
                    "namespaces[{}] needs both binding and class_name",
                    index
                )));
            }
            if self.namespaces[..index].iter().any(|other| other.binding == ns.binding) {
                return Err(HarnessError::Config(format!(
                    "duplicate namespace binding {}",
                    ns.binding
                )));
            }
        }
        Ok(())
    }

    /// Bindings of every namespace hosted in this isolate, in declaration order.
    pub fn same_isolate_bindings(&self) -> Vec<String> {
        self.namespaces
            .iter()
            .filter(|ns| ns.same_isolate)
            .map(|ns| ns.binding.clone())
            .collect()
    }
}

/// Source of the harness configuration.
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self) -> Result<HarnessConfig>;
}

/// A [`ConfigResolver`] over a config value fixed at construction.
#[derive(Debug, Clone)]
pub struct StaticConfig(HarnessConfig);

impl StaticConfig {
    pub fn new(config: HarnessConfig) -> Self {
        Self(config)
    }
}

impl ConfigResolver for StaticConfig {
    fn resolve(&self) -> Result<HarnessConfig> {
        self.0.validate()?;
        Ok(self.0.clone())
    }
}
