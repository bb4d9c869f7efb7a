#![allow(dead_code)]

use actor_harness::runtime::setup_tracing;
use actor_harness::{
    ActorClass, ActorError, ActorState, DurableActor, Env, HarnessConfig, Module, Request,
    Response, Runtime, StaticModuleLoader,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MAIN_MODULE: &str = "worker";

#[derive(Debug, thiserror::Error)]
#[error("counter failure: {0}")]
pub struct CounterError(pub String);

/// Counts requests in durable storage and remembers how often its alarm ran.
pub struct Counter {
    state: ActorState,
    greeting: String,
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter")
            .field("greeting", &self.greeting)
            .finish_non_exhaustive()
    }
}

impl Counter {
    pub fn new(state: ActorState, env: Env) -> Self {
        let greeting = env
            .var("GREETING")
            .and_then(|value| value.as_str())
            .unwrap_or("hello")
            .to_string();
        Self { state, greeting }
    }

    async fn read(&self, key: &str) -> Result<u64, ActorError> {
        Ok(self
            .state
            .storage()
            .get(key)
            .await?
            .and_then(|value| value.as_u64())
            .unwrap_or(0))
    }

    pub async fn count(&self) -> Result<u64, ActorError> {
        self.read("count").await
    }

    pub async fn alarms(&self) -> Result<u64, ActorError> {
        self.read("alarms").await
    }

    pub async fn increment(&self) -> Result<u64, ActorError> {
        let next = self.count().await? + 1;
        self.state.storage().put("count", json!(next)).await?;
        Ok(next)
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }
}

#[async_trait]
impl DurableActor for Counter {
    async fn fetch(&self, request: Request) -> Result<Response, ActorError> {
        match request.path() {
            "/fail" => Err(Box::new(CounterError("fetch refused".into()))),
            "/panic" => panic!("fetch exploded"),
            "/count" => Ok(Response::json(&json!({ "value": self.count().await? }))?),
            _ => Ok(Response::json(&json!({ "value": self.increment().await? }))?),
        }
    }

    async fn alarm(&self) -> Result<(), ActorError> {
        let next = self.alarms().await? + 1;
        self.state.storage().put("alarms", json!(next)).await?;
        Ok(())
    }
}

/// An actor whose alarm always fails. It remembers where the last error lives.
#[derive(Default)]
pub struct Alarmist {
    raised: AtomicUsize,
}

impl Alarmist {
    pub fn last_error(&self) -> usize {
        self.raised.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableActor for Alarmist {
    async fn alarm(&self) -> Result<(), ActorError> {
        let error: ActorError = Box::new(CounterError("alarm refused".into()));
        self.raised.store(address_of(&error), Ordering::SeqCst);
        Err(error)
    }
}

/// Address of a boxed error, for identity checks.
pub fn address_of(error: &ActorError) -> usize {
    &**error as *const _ as *const () as usize
}

/// An actor with no hooks of its own.
#[derive(Debug)]
pub struct Silent;

impl DurableActor for Silent {}

pub fn worker_module() -> Module {
    Module::new(MAIN_MODULE)
        .with_class(ActorClass::new("Counter", |state, env| async move {
            Ok::<_, ActorError>(Counter::new(state, env))
        }))
        .with_class(ActorClass::new("Silent", |_, _| async {
            Ok::<_, ActorError>(Silent)
        }))
        .with_class(ActorClass::new("Alarmist", |_, _| async {
            Ok::<_, ActorError>(Alarmist::default())
        }))
        .with_class(ActorClass::new("Broken", |_, _| async {
            Err::<Silent, ActorError>(Box::new(CounterError("constructor refused".into())))
        }))
        .with_value("VERSION", 1)
}

pub fn worker_loader() -> Arc<StaticModuleLoader> {
    Arc::new(StaticModuleLoader::new(MAIN_MODULE).define(MAIN_MODULE, worker_module))
}

pub fn harness_config() -> HarnessConfig {
    HarnessConfig::new()
        .with_namespace("COUNTER", "Counter")
        .with_namespace("SILENT", "Silent")
        .with_namespace("BROKEN", "Broken")
        .with_namespace("ALARMIST", "Alarmist")
        .with_namespace("VERSION", "VERSION")
        .with_var("GREETING", "hi")
}

pub fn runtime_with(loader: Arc<StaticModuleLoader>) -> Runtime {
    setup_tracing();
    Runtime::builder(loader)
        .config(harness_config())
        .build()
        .expect("Failed to build runtime")
}

pub fn runtime() -> Runtime {
    runtime_with(worker_loader())
}

pub fn get(path: &str) -> Request {
    Request::get(format!("https://example.com{}", path))
}

pub fn value_of(response: &Response) -> u64 {
    assert_eq!(response.status, 200);
    let body: serde_json::Value = response.body_json().expect("Response is not json");
    body["value"].as_u64().expect("Response has no value")
}
