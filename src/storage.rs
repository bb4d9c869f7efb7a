//! # Actor Storage
//!
//! Durable key/value storage and the alarm schedule belong to each actor's own storage
//! facility. The harness only consumes the narrow [`ActorStorage`] interface; it never
//! persists anything of its own.
//!
//! [`MemoryStorageProvider`] is the in-memory implementation used by default. It hands
//! out one [`MemoryStorage`] per actor id and keeps it for the provider's lifetime, so
//! state survives when a host is replaced after an abort.

use crate::error::Result;
use crate::id::ActorId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

/// Per-actor storage facility.
#[async_trait]
pub trait ActorStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Deletes a key, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Lists keys starting with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<BTreeMap<String, serde_json::Value>>;

    async fn get_alarm(&self) -> Result<Option<SystemTime>>;

    async fn set_alarm(&self, time: SystemTime) -> Result<()>;

    async fn delete_alarm(&self) -> Result<()>;
}

/// Hands out the storage facility of each actor.
pub trait StorageProvider: Send + Sync {
    fn storage_for(&self, id: &ActorId) -> Arc<dyn ActorStorage>;
}

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<String, serde_json::Value>,
    alarm: Option<SystemTime>,
}

/// In-memory [`ActorStorage`].
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActorStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.state.lock().entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.state.lock().entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.state.lock().entries.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<BTreeMap<String, serde_json::Value>> {
        let state = self.state.lock();
        Ok(state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn get_alarm(&self) -> Result<Option<SystemTime>> {
        Ok(self.state.lock().alarm)
    }

    async fn set_alarm(&self, time: SystemTime) -> Result<()> {
        self.state.lock().alarm = Some(time);
        Ok(())
    }

    async fn delete_alarm(&self) -> Result<()> {
        self.state.lock().alarm = None;
        Ok(())
    }
}

/// [`StorageProvider`] backed by [`MemoryStorage`].
#[derive(Default)]
pub struct MemoryStorageProvider {
    storages: Mutex<HashMap<ActorId, Arc<MemoryStorage>>>,
}

impl MemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn storage_for(&self, id: &ActorId) -> Arc<dyn ActorStorage> {
        let mut storages = self.storages.lock();
        storages
            .entry(id.clone())
            .or_insert_with(|| Arc::new(MemoryStorage::new()))
            .clone()
    }
}
