//! # Actor Namespaces
//!
//! An [`ActorNamespace`] mints ids for one actor class and hands out stubs to their
//! hosts. Each namespace holds a secret [`NamespaceKey`]; ids carry a tag derived from
//! it, so only the namespace that minted an id can turn its string form back into an
//! id. The same-isolate validator relies on that.
//!
//! Hosts are spawned on first [`get`](ActorNamespace::get) and reused while they are
//! healthy. A reference to an aborted or exited host gets a replacement host over the same
//! storage.

use crate::host::{ActorHost, HostParams};
use crate::error::{HarnessError, Result};
use crate::id::{ActorId, NamespaceKey};
use crate::runtime::RuntimeInner;
use crate::host::ActorStub;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, info};

struct NamespaceInner {
    binding: String,
    class_name: String,
    key: NamespaceKey,
    hosts: Mutex<HashMap<ActorId, ActorStub>>,
    runtime: Weak<RuntimeInner>,
}

/// Namespace of one actor class. Cheap to clone.
#[derive(Clone)]
pub struct ActorNamespace {
    inner: Arc<NamespaceInner>,
}

impl ActorNamespace {
    pub(crate) fn new(binding: &str, class_name: &str, runtime: Weak<RuntimeInner>) -> Self {
        Self {
            inner: Arc::new(NamespaceInner {
                binding: binding.to_string(),
                class_name: class_name.to_string(),
                key: NamespaceKey::generate(),
                hosts: Mutex::new(HashMap::new()),
                runtime,
            }),
        }
    }

    pub fn binding(&self) -> &str {
        &self.inner.binding
    }

    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    pub fn id_from_name(&self, name: &str) -> ActorId {
        self.inner.key.id_from_name(name)
    }

    pub fn new_unique_id(&self) -> ActorId {
        self.inner.key.unique_id()
    }

    /// Reconstructs an id from its string form. Fails unless this namespace minted it.
    pub fn id_from_string(&self, value: &str) -> Result<ActorId> {
        self.inner.key.id_from_string(value)
    }

    /// Returns a stub for the actor with `id`, starting its host if needed.
    ///
    /// Starting a host requires a tokio runtime; outside one this is a usage error.
    pub fn get(&self, id: &ActorId) -> Result<ActorStub> {
        self.id_from_string(&id.to_string())?;
        let id = id.clone();

        let mut hosts = self.inner.hosts.lock();
        if let Some(stub) = hosts.get(&id) {
            if !stub.is_aborted() && !stub.is_closed() {
                return Ok(stub.clone());
            }
            info!(
                binding = %self.inner.binding,
                actor_id = %id,
                aborted = stub.is_aborted(),
                "Replacing dead actor host"
            );
        }

        let handle = Handle::try_current().map_err(|_| {
            HarnessError::Usage(format!(
                "Actor {} can only be started from within a tokio runtime",
                id
            ))
        })?;

        let runtime = self.inner.runtime.upgrade().ok_or_else(|| {
            HarnessError::Usage(format!(
                "Runtime owning namespace {} has been dropped",
                self.inner.binding
            ))
        })?;
        debug!(binding = %self.inner.binding, actor_id = %id, "Starting actor host");
        let stub = ActorHost::spawn(
            &handle,
            HostParams {
                id: id.clone(),
                class_name: self.inner.class_name.clone(),
                storage: runtime.storage.storage_for(&id),
                loader: runtime.loader.clone(),
                env: runtime.env(),
                actions: runtime.actions.clone(),
                mailbox_capacity: runtime.mailbox_capacity(),
            },
        );
        hosts.insert(id, stub.clone());
        Ok(stub)
    }

    pub fn get_by_name(&self, name: &str) -> Result<ActorStub> {
        self.get(&self.id_from_name(name))
    }

    /// Ids of every actor this namespace has started, aborted ones included,
    /// ordered by their string form.
    pub fn ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self.inner.hosts.lock().keys().cloned().collect();
        ids.sort_by_key(|id| id.to_string());
        ids
    }
}

impl std::fmt::Debug for ActorNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorNamespace")
            .field("binding", &self.inner.binding)
            .field("class_name", &self.inner.class_name)
            .finish()
    }
}
