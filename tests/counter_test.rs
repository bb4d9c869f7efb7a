mod common;

use actor_harness::{ActorError, ActorState, HarnessError};
use common::{get, runtime, value_of, Counter, Silent};
use std::sync::Arc;

/// Ordinary calls and context callbacks see the same actor, in order.
#[tokio::test]
async fn test_counter_scenario() {
    let runtime = runtime();
    let client = runtime.client();
    let stub = runtime
        .namespace("COUNTER")
        .unwrap()
        .get_by_name("scenario")
        .unwrap();

    let first = stub.fetch(get("/")).await.expect("First call failed");
    assert_eq!(value_of(&first), 1);
    let second = stub.fetch(get("/")).await.expect("Second call failed");
    assert_eq!(value_of(&second), 2);

    // Read internal storage from inside the actor
    let stored = client
        .run_with_context(&stub, |_: Arc<Counter>, state: ActorState| async move {
            let value = state.storage().get("count").await?;
            Ok::<_, ActorError>(value.and_then(|v| v.as_u64()))
        })
        .await
        .expect("Callback failed");
    assert_eq!(stored, Some(2));

    let third = stub.fetch(get("/")).await.expect("Third call failed");
    assert_eq!(value_of(&third), 3);
}

#[tokio::test]
async fn test_get_instance_returns_the_live_object() {
    let runtime = runtime();
    let client = runtime.client();
    let stub = runtime
        .namespace("COUNTER")
        .unwrap()
        .get_by_name("live")
        .unwrap();

    let counter: Arc<Counter> = client.get_instance(&stub).await.expect("get_instance failed");
    assert_eq!(counter.greeting(), "hi");

    stub.fetch(get("/")).await.unwrap();
    assert_eq!(counter.count().await.unwrap(), 1);

    let again: Arc<Counter> = client.get_instance(&stub).await.unwrap();
    assert!(Arc::ptr_eq(&counter, &again));
}

#[tokio::test]
async fn test_distinct_references_get_distinct_instances() {
    let runtime = runtime();
    let client = runtime.client();
    let namespace = runtime.namespace("COUNTER").unwrap();
    let a = namespace.get(&namespace.new_unique_id()).unwrap();
    let b = namespace.get(&namespace.new_unique_id()).unwrap();
    assert_ne!(a.id(), b.id());

    let first: Arc<Counter> = client.get_instance(&a).await.unwrap();
    let second: Arc<Counter> = client.get_instance(&b).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    // State is per actor
    a.fetch(get("/")).await.unwrap();
    assert_eq!(first.count().await.unwrap(), 1);
    assert_eq!(second.count().await.unwrap(), 0);

    let ids = client.list_actor_ids(&namespace);
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(a.id()) && ids.contains(b.id()));
}

#[tokio::test]
async fn test_get_instance_with_wrong_type_is_usage_error() {
    let runtime = runtime();
    let client = runtime.client();
    let stub = runtime
        .namespace("COUNTER")
        .unwrap()
        .get_by_name("typed")
        .unwrap();

    let err = client.get_instance::<Silent>(&stub).await.unwrap_err();
    assert!(err.is_usage());

    let err = client
        .run_with_context(&stub, |_: Arc<Silent>, _| async { Ok::<_, ActorError>(()) })
        .await
        .unwrap_err();
    assert!(err.is_usage());
    assert_eq!(runtime.actions().pending(), 0);
}

#[tokio::test]
async fn test_missing_fetch_handler() {
    let runtime = runtime();
    let client = runtime.client();
    let stub = runtime
        .namespace("SILENT")
        .unwrap()
        .get_by_name("quiet")
        .unwrap();

    let err = stub.fetch(get("/")).await.unwrap_err();
    assert!(matches!(err, HarnessError::HandlerNotImplemented { hook: "fetch" }));

    // Other hooks default to no-ops
    stub.alarm().await.expect("Default alarm hook failed");
    stub.web_socket_close(1000, "bye", true).await.unwrap();
    assert!(client.get_instance::<Silent>(&stub).await.is_ok());
}

#[tokio::test]
async fn test_non_class_export_is_usage_error() {
    let runtime = runtime();
    let stub = runtime
        .namespace("VERSION")
        .unwrap()
        .get_by_name("x")
        .unwrap();

    let err = runtime.client().get_instance::<Silent>(&stub).await.unwrap_err();
    assert!(err.is_usage());
    assert!(err.to_string().contains("not a class"));
}

#[tokio::test]
async fn test_constructor_failure_aborts_host() {
    let runtime = runtime();
    let client = runtime.client();
    let namespace = runtime.namespace("BROKEN").unwrap();
    let stub = namespace.get_by_name("x").unwrap();

    let err = client.get_instance::<Silent>(&stub).await.unwrap_err();
    assert_eq!(err.to_string(), "counter failure: constructor refused");
    assert!(stub.is_aborted());

    let err = stub.fetch(get("/")).await.unwrap_err();
    assert!(matches!(err, HarnessError::Aborted { .. }));
}
