//! Integration tests for the proxy router.
//!
//! Upstreams are `wiremock` servers; the local inference server is replaced
//! by a fake that records activations.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use switchyard_core::{BackendDescriptor, BackendRegistry, LocalServerPort, ProcessError};
use switchyard_proxy::{AppState, TargetState, build_client, build_router};

#[derive(Default)]
struct FakeLocalServer {
    activations: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl LocalServerPort for FakeLocalServer {
    async fn activate(&self, model_path: &Path) -> Result<(), ProcessError> {
        self.activations
            .lock()
            .unwrap()
            .push(model_path.to_path_buf());
        Ok(())
    }
}

struct TestProxy {
    app: Router,
    local: Arc<FakeLocalServer>,
    targets: Arc<TargetState>,
}

fn proxy(remote_base_url: &str, local_port: u16) -> TestProxy {
    let registry = BackendRegistry::new(
        BTreeMap::from([
            (
                "default".to_string(),
                BackendDescriptor::Remote {
                    base_url: remote_base_url.to_string(),
                },
            ),
            (
                "local1".to_string(),
                BackendDescriptor::Local {
                    model_filename: "model.bin".to_string(),
                },
            ),
        ]),
        "default",
    )
    .unwrap();

    let local = Arc::new(FakeLocalServer::default());
    let targets = Arc::new(TargetState::new(registry, local.clone(), "/models"));
    let client = build_client(Duration::from_secs(5)).unwrap();
    let state = AppState::new(Arc::clone(&targets), client, local_port, true);

    TestProxy {
        app: build_router(state),
        local,
        targets,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn set_target(name: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/set_target")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "target": name }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn forwards_to_default_remote_target() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let (status, _, body) = send(&proxy.app, get("/v1/models")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"data":[]}"#);
}

#[tokio::test]
async fn switching_to_local_target_routes_to_local_port() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote"))
        .expect(0)
        .mount(&remote)
        .await;

    let local_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("local"))
        .expect(1)
        .mount(&local_server)
        .await;

    let proxy = proxy(&remote.uri(), local_server.address().port());

    let (status, _, body) = send(&proxy.app, set_target("local1")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"message": "Target set to local(model.bin)"}));
    assert_eq!(
        *proxy.local.activations.lock().unwrap(),
        [PathBuf::from("/models/model.bin")]
    );

    let (status, _, body) = send(&proxy.app, get("/v1/models")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"local");
}

#[tokio::test]
async fn unknown_target_is_rejected_and_routing_unchanged() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote"))
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);

    let (status, _, body) = send(&proxy.app, set_target("nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"error": "Invalid target: nope"}));
    assert_eq!(proxy.targets.current().name, "default");
    assert!(proxy.local.activations.lock().unwrap().is_empty());

    let (status, _, body) = send(&proxy.app, get("/v1/models")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"remote");
}

#[tokio::test]
async fn malformed_set_target_body_is_bad_request() {
    let proxy = proxy("http://127.0.0.1:1", 1);
    let request = Request::builder()
        .method("POST")
        .uri("/set_target")
        .body(Body::from("{\"name\": \"local1\"}"))
        .unwrap();

    let (status, _, body) = send(&proxy.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    assert_eq!(proxy.targets.current().name, "default");
}

#[tokio::test]
async fn request_and_response_bytes_pass_through_unchanged() {
    // Not JSON and not UTF-8: the inspector must leave it alone
    let request_body: &[u8] = b"prompt=\xff\x00binary";
    let response_body: &[u8] = b"data: {\"text\": \"hi\"}\n\ndata: not-json\n\n";

    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(header("x-request-id", "abc-123"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_bytes(request_body))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .insert_header("x-upstream", "yes")
                .set_body_bytes(response_body),
        )
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .header("x-request-id", "abc-123")
        .header("authorization", "Bearer sk-test")
        .body(Body::from(request_body))
        .unwrap();

    let (status, headers, body) = send(&proxy.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, response_body);
    assert_eq!(headers.get("x-upstream").unwrap(), "yes");
    assert_eq!(headers.get("content-type").unwrap(), "text/event-stream");
}

#[tokio::test]
async fn completion_json_body_is_forwarded_verbatim_with_inspection_on() {
    let request_body = br#"{"prompt": "def add(a, b):", "suffix": "\n", "max_tokens": 16}"#;

    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(body_bytes(&request_body[..]))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"choices":[]}"#))
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .header("content-type", "application/json")
        .body(Body::from(&request_body[..]))
        .unwrap();

    let (status, _, _) = send(&proxy.app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn query_string_is_preserved() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let (status, _, _) = send(&proxy.app, get("/v1/models?limit=2")).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn put_and_delete_are_forwarded() {
    let remote = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/files/1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/files/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let put = Request::builder()
        .method("PUT")
        .uri("/v1/files/1")
        .body(Body::from("data"))
        .unwrap();
    let delete = Request::builder()
        .method("DELETE")
        .uri("/v1/files/1")
        .body(Body::empty())
        .unwrap();

    assert_eq!(send(&proxy.app, put).await.0, StatusCode::CREATED);
    assert_eq!(send(&proxy.app, delete).await.0, StatusCode::OK);
}

#[tokio::test]
async fn upstream_error_status_is_relayed() {
    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/completions")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _, body) = send(&proxy.app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, b"overloaded");
}

/// Upstream that reads one request head, writes `reply` and hangs up.
async fn hang_up_after(reply: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        socket.write_all(reply).await.unwrap();
        socket.flush().await.unwrap();
    });
    addr
}

async fn assert_degraded(addr: SocketAddr) {
    let proxy = proxy(&format!("http://{addr}"), 1);
    let (status, headers, body) = send(&proxy.app, get("/v1/completions")).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(headers.is_empty(), "unexpected headers: {headers:?}");
    assert!(body.is_empty());
}

#[tokio::test]
async fn premature_close_yields_empty_no_content() {
    assert_degraded(hang_up_after(b"").await).await;
}

#[tokio::test]
async fn truncated_fixed_length_body_yields_empty_no_content() {
    let reply = b"HTTP/1.1 200 OK\r\n\
content-type: application/json\r\n\
content-length: 100\r\n\
\r\n\
{\"choices\": [";
    assert_degraded(hang_up_after(reply).await).await;
}

#[tokio::test]
async fn interrupted_event_stream_yields_empty_no_content() {
    // One complete chunk, then no terminating zero-length chunk
    let reply = b"HTTP/1.1 200 OK\r\n\
content-type: text/event-stream\r\n\
transfer-encoding: chunked\r\n\
\r\n\
10\r\n\
data: {\"n\": 1}\n\n\r\n";
    assert_degraded(hang_up_after(reply).await).await;
}

#[tokio::test]
async fn redirects_are_relayed_not_followed() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "http://127.0.0.1:1/elsewhere"),
        )
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let (status, headers, _) = send(&proxy.app, get("/v1/models")).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers.get("location").unwrap(), "http://127.0.0.1:1/elsewhere");
}

#[tokio::test]
async fn unreachable_upstream_is_generic_server_error() {
    // Port 1 is never listening in the test environment
    let proxy = proxy("http://127.0.0.1:1", 1);

    let (status, _, body) = send(&proxy.app, get("/v1/models")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"error": "Server error"}));
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let proxy = proxy("http://127.0.0.1:1", 1);
    let request = Request::builder()
        .method("PATCH")
        .uri("/v1/models")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(&proxy.app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers.get("allow").unwrap(), "GET, POST, PUT, DELETE");
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn get_on_set_target_path_is_forwarded() {
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/set_target"))
        .respond_with(ResponseTemplate::new(200).set_body_string("upstream"))
        .expect(1)
        .mount(&remote)
        .await;

    let proxy = proxy(&remote.uri(), 1);
    let (status, _, body) = send(&proxy.app, get("/set_target")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"upstream");
}
