mod common;

use actor_harness::ActorError;
use common::{get, runtime, value_of, Counter};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Concurrent callbacks on one actor resolve independently and never interleave.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_actions_resolve_independently() {
    let runtime = runtime();
    let client = runtime.client();
    let stub = runtime.namespace("COUNTER").unwrap().get_by_name("busy").unwrap();

    let calls = (0..16u64).map(|index| {
        let client = client.clone();
        let stub = stub.clone();
        async move {
            client
                .run_with_context(&stub, move |_: Arc<Counter>, state| async move {
                    // Read, yield, then write: lost updates would show if callbacks overlapped
                    let current = state
                        .storage()
                        .get("count")
                        .await?
                        .and_then(|v| v.as_u64())
                        .unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    state.storage().put("count", json!(current + 1)).await?;
                    Ok::<_, ActorError>(index)
                })
                .await
        }
    });

    let results = join_all(calls).await;
    for (index, result) in results.into_iter().enumerate() {
        assert_eq!(result.expect("Callback failed"), index as u64);
    }

    let response = stub.fetch(get("/count")).await.unwrap();
    assert_eq!(value_of(&response), 16);
    assert_eq!(runtime.actions().pending(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_calls_across_actors() {
    let runtime = runtime();
    let client = runtime.client();
    let namespace = runtime.namespace("COUNTER").unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let client = client.clone();
            let stub = namespace.get_by_name(&format!("actor-{}", n % 2)).unwrap();
            tokio::spawn(async move {
                stub.fetch(get("/")).await.unwrap();
                let counter: Arc<Counter> = client.get_instance(&stub).await.unwrap();
                counter.count().await.unwrap()
            })
        })
        .collect();

    for task in tasks {
        let count = task.await.expect("Task panicked");
        assert!((1..=4).contains(&count));
    }

    for name in ["actor-0", "actor-1"] {
        let stub = namespace.get_by_name(name).unwrap();
        let response = stub.fetch(get("/count")).await.unwrap();
        assert_eq!(value_of(&response), 4);
    }
    assert_eq!(runtime.actions().pending(), 0);
}
