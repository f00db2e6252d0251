//! End-to-end tests against a live mock server on an ephemeral port
#![allow(clippy::unwrap_used)]

use namespaced_store_web::{serve, AppState};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing_subscriber::fmt::MakeWriter;

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, stop) = oneshot::channel::<()>();

        tokio::spawn(serve(listener, AppState::new(), async move {
            let _ = stop.await;
        }));

        Self {
            addr,
            shutdown: Some(shutdown),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

#[tokio::test]
async fn test_get_starts_empty() {
    let server = TestServer::start().await;

    let response = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "data": []}));
}

#[tokio::test]
async fn test_post_then_get_round_trip() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let list = json!([{"id": 1, "content": "a", "done": false}]);

    let response = client.post(server.url("/")).json(&list).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"success": true}));

    let body: Value = client.get(server.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({"success": true, "data": list}));
}

#[tokio::test]
async fn test_every_path_shares_the_list() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client
        .post(server.url("/todos"))
        .json(&json!([1, 2, 3]))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(server.url("/anything/else"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"], json!([1, 2, 3]));
}

#[tokio::test]
async fn test_post_rejects_non_array() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/"))
        .json(&json!({"id": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>().await.unwrap()["code"], "BAD_REQUEST");

    let response = client.post(server.url("/")).body("not json").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = client.get(server.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_preflight_carries_cors_headers() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .request(Method::OPTIONS, server.url("/"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-max-age"], "86400");
}

#[tokio::test]
async fn test_other_methods_return_empty_ok() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    for method in [Method::PUT, Method::DELETE, Method::PATCH, Method::OPTIONS] {
        let response = client.request(method.clone(), server.url("/")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{method}");
        assert!(response.bytes().await.unwrap().is_empty(), "{method}");
    }
}

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_requests_are_logged_at_info() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    // The test runtime is single-threaded, so the server task logs here too.
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = TestServer::start().await;
    let response = reqwest::get(server.url("/todos")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = logs.text();
    assert!(text.contains("finished processing request"), "{text}");
    assert!(text.contains("INFO"), "{text}");
}
