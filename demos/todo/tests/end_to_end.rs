//! The todo demo against the mock server and against the in-memory backend

#![allow(clippy::unwrap_used)]

use namespaced_store_runtime::RetryPolicy;
use namespaced_store_testing::{init_tracing, ActionRecorder};
use namespaced_store_web::{serve, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use todo::{HttpTodoApi, InMemoryTodoApi, TodoApp, TodoItem};
use tokio::sync::oneshot;

const WAIT: Duration = Duration::from_secs(5);

/// Start the mock server on a free port; dropping the sender stops it
async fn mock_server() -> (String, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let (stop, stopped) = oneshot::channel::<()>();

    tokio::spawn(serve(listener, AppState::new(), async move {
        let _ = stopped.await;
    }));

    (url, stop)
}

fn item(id: u64, content: &str, done: bool) -> TodoItem {
    TodoItem {
        id,
        content: content.to_string(),
        done,
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(3)
        .initial_delay(Duration::from_millis(10))
        .build()
}

#[tokio::test]
async fn test_mock_server_round_trip() {
    let (url, _stop) = mock_server().await;
    let client = reqwest::Client::new();

    let saved: Value = client
        .post(&url)
        .json(&json!([{"id": 1, "content": "a", "done": false}]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(saved, json!({"success": true}));

    let fetched: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(
        fetched,
        json!({"success": true, "data": [{"id": 1, "content": "a", "done": false}]})
    );
}

#[tokio::test]
async fn test_save_then_fetch_through_the_store() {
    init_tracing();
    let (url, _stop) = mock_server().await;

    let writer = TodoApp::start(Arc::new(HttpTodoApi::new(url.clone())), fast_retry()).unwrap();
    writer.add("a").await.unwrap();
    writer.add("b").await.unwrap();
    writer.toggle(2).await.unwrap();
    writer.save().await.unwrap();

    // Wait for the save to land on the server.
    let api = HttpTodoApi::new(url.clone());
    let expected = vec![item(1, "a", false), item(2, "b", true)];
    tokio::time::timeout(WAIT, async {
        loop {
            if todo::TodoApi::fetch(&api).await.unwrap() == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    let reader = TodoApp::start(Arc::new(HttpTodoApi::new(url)), fast_retry()).unwrap();
    let recorder = ActionRecorder::start(reader.store().subscribe_actions());
    reader.fetch().await.unwrap();

    assert!(recorder.wait_for("@Todo/set", WAIT).await.is_some());
    let state = reader.snapshot().await;
    assert_eq!(state.items, expected);
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_fetch_from_unreachable_server_reports_failure() {
    let app = TodoApp::start(
        Arc::new(HttpTodoApi::new("http://127.0.0.1:1/")),
        RetryPolicy::none(),
    )
    .unwrap();
    let recorder = ActionRecorder::start(app.store().subscribe_actions());

    app.fetch().await.unwrap();

    assert!(recorder.wait_for("@Todo/failed", WAIT).await.is_some());
    let state = app.snapshot().await;
    assert!(!state.loading);
    assert!(state.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_retries_transient_failures() {
    let api = Arc::new(InMemoryTodoApi::new(vec![item(1, "a", false)]).with_failures(2));
    let app = TodoApp::start(api.clone(), fast_retry()).unwrap();
    let recorder = ActionRecorder::start(app.store().subscribe_actions());

    app.fetch().await.unwrap();

    assert!(recorder.wait_for("@Todo/set", WAIT).await.is_some());
    assert_eq!(api.fetches(), 3);
    assert_eq!(app.snapshot().await.items, vec![item(1, "a", false)]);
    assert_eq!(recorder.count("@Todo/failed"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_fetches_apply_latest_only() {
    let api = Arc::new(InMemoryTodoApi::new(vec![item(1, "a", false)]).with_latency(Duration::from_secs(1)));
    let app = TodoApp::start(api.clone(), RetryPolicy::none()).unwrap();
    let recorder = ActionRecorder::start(app.store().subscribe_actions());

    app.fetch().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    app.fetch().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(api.fetches(), 2);
    assert_eq!(recorder.count("@Todo/loading"), 2);
    assert_eq!(recorder.count("@Todo/set"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_saves_apply_leading_only() {
    let api = Arc::new(InMemoryTodoApi::default().with_latency(Duration::from_secs(1)));
    let app = TodoApp::start(api.clone(), RetryPolicy::none()).unwrap();

    app.add("first").await.unwrap();
    app.save().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    app.add("second").await.unwrap();
    app.save().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(api.saves(), 1);
    assert_eq!(api.items(), vec![item(1, "first", false)]);
}
