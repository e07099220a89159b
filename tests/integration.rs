//! Integration tests for reqline -- drives `HttpTransport` against a local
//! wiremock `MockServer`.

use std::time::{Duration, Instant};

use reqline::{Client, HttpTransport, RequestRejected, StatusCode};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: a `Client` on an `HttpTransport` with a generous timeout.
fn test_client() -> Client {
    let transport = HttpTransport::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("transport build should succeed");
    Client::new(transport)
}

/// Helper: mount a mock answering `verb path` with `status` and `body`.
async fn mock(verb: &str, path_str: &str, status: u16, body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method(verb))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

/// The single request the server received.
async fn only_request(server: &MockServer) -> wiremock::Request {
    let mut received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1, "expected exactly one request");
    received.remove(0)
}

// -----------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------

#[tokio::test]
async fn get_resolves_with_parsed_json() {
    let server = mock("GET", "/data", 200, json!({"hello": "world"})).await;

    let body = test_client()
        .request(format!("{}/data", server.uri()))
        .get()
        .await
        .expect("request should succeed");

    assert_eq!(body, json!({"hello": "world"}));
}

#[tokio::test]
async fn text_mode_returns_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1}"#))
        .mount(&server)
        .await;

    let body = test_client()
        .request(format!("{}/raw", server.uri()))
        .json(false)
        .get()
        .await
        .unwrap();

    assert_eq!(body, json!(r#"{"a":1}"#));
}

#[tokio::test]
async fn head_resolves_with_null_body() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let body = test_client().request(server.uri()).head().await.unwrap();
    assert_eq!(body, Value::Null);
}

// -----------------------------------------------------------------------
// Headers
// -----------------------------------------------------------------------

#[tokio::test]
async fn headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("accept-language", "fr-fr"))
        .and(header("x-other", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    test_client()
        .request(server.uri())
        .header("accept-language", "fr-fr")
        .header("x-other", "1")
        .get()
        .await
        .expect("matching headers");
}

#[tokio::test]
async fn replaced_and_cleared_headers_are_not_sent() {
    let server = mock("GET", "/", 200, json!(null)).await;
    let client = test_client();

    client
        .request(server.uri())
        .header("x-dropped", "1")
        .headers([("x-kept", "2")])
        .get()
        .await
        .unwrap();
    client
        .request(server.uri())
        .header("accept-language", "fr-fr")
        .clear_headers()
        .get()
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    assert!(received[0].headers.get("x-dropped").is_none());
    assert_eq!(received[0].headers.get("x-kept").unwrap(), "2");
    assert!(received[1].headers.get("accept-language").is_none());
}

#[tokio::test]
async fn json_mode_sets_accept_and_default_headers_apply() {
    let server = mock("GET", "/", 200, json!(null)).await;
    let transport = HttpTransport::builder()
        .user_agent("reqline-test")
        .default_header("x-default", "yes")
        .build()
        .unwrap();

    Client::new(transport).request(server.uri()).get().await.unwrap();

    let req = only_request(&server).await;
    assert_eq!(req.headers.get("accept").unwrap(), "application/json");
    assert_eq!(req.headers.get("user-agent").unwrap(), "reqline-test");
    assert_eq!(req.headers.get("x-default").unwrap(), "yes");
}

#[tokio::test]
async fn bearer_auth_is_sent() {
    let server = MockServer::start().await;
    Mock::given(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    test_client()
        .request(server.uri())
        .bearer_auth("tok")
        .get()
        .await
        .unwrap();
}

// -----------------------------------------------------------------------
// URL building
// -----------------------------------------------------------------------

#[tokio::test]
async fn path_segments_append_to_base() {
    let server = mock("GET", "/api/v1/users", 200, json!([])).await;

    let body = test_client()
        .request(format!("{}/api", server.uri()))
        .path(["v1", "users"])
        .get()
        .await
        .expect("path should resolve to /api/v1/users");
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn empty_path_resets_to_root() {
    let server = mock("GET", "/", 200, json!("root")).await;

    let body = test_client()
        .request(format!("{}/deep/path", server.uri()))
        .path(Vec::<&str>::new())
        .get()
        .await
        .unwrap();
    assert_eq!(body, json!("root"));
}

#[tokio::test]
async fn query_params_are_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("hello", "heléèloç"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    test_client()
        .request(server.uri())
        .query("hello", "heléèloç")
        .query("page", 0)
        .query("skipped", None::<&str>)
        .get()
        .await
        .unwrap();

    let req = only_request(&server).await;
    assert_eq!(req.url.query(), Some("hello=hel%C3%A9%C3%A8lo%C3%A7&page=0"));
}

// -----------------------------------------------------------------------
// Bodies
// -----------------------------------------------------------------------

#[tokio::test]
async fn post_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"test": "test"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let body = test_client()
        .request(server.uri())
        .path(["items"])
        .body(&json!({"test": "test"}))
        .post()
        .await
        .unwrap();
    assert_eq!(body, json!({"id": 1}));
}

#[tokio::test]
async fn text_mode_sends_string_body_raw() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(body_string("plain words"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_client()
        .request(server.uri())
        .json(false)
        .body("plain words")
        .put()
        .await
        .unwrap();
}

// -----------------------------------------------------------------------
// Rejections
// -----------------------------------------------------------------------

#[tokio::test]
async fn status_500_rejects_with_response_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let rejected = test_client()
        .request(server.uri())
        .header("accept-language", "fr-fr")
        .get()
        .await
        .unwrap_err();

    assert!(rejected.is_status());
    assert_eq!(rejected.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    let response = rejected.response().unwrap();
    assert_eq!(response.status_message, "Internal Server Error");
    assert!(response.headers.contains_key("content-length"));
    assert_eq!(rejected.request().method, "GET");
    assert_eq!(rejected.request().headers["accept-language"], "fr-fr");
    assert_eq!(rejected.stack(), "");

    let json = rejected.to_json();
    assert_eq!(json["message"]["response"]["statusCode"], 500);
    assert!(json["message"].get("error").is_none());
    assert!(!json.to_string().contains("boom"));

    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(rejected);
    assert!(boxed.downcast_ref::<RequestRejected>().is_some());
}

#[tokio::test]
async fn rejection_records_dispatched_method() {
    let server = mock("POST", "/", 404, json!(null)).await;

    let rejected = test_client()
        .request(server.uri())
        .post()
        .await
        .unwrap_err();
    assert_eq!(rejected.request().method, "POST");
    assert_eq!(rejected.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&server)
        .await;

    let rejected = test_client()
        .request(format!("{}/old", server.uri()))
        .get()
        .await
        .unwrap_err();
    assert_eq!(rejected.status(), Some(StatusCode::FOUND));
    assert_eq!(rejected.response().unwrap().headers["location"], "/new");
}

#[tokio::test]
async fn connection_refused_rejects_with_error_detail() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let rejected = test_client()
        .request(format!("http://127.0.0.1:{port}/"))
        .get()
        .await
        .unwrap_err();

    assert!(rejected.is_transport());
    assert!(rejected.response().is_none());
    let error = rejected.error().unwrap();
    assert_eq!(error.name, "ConnectError");
    assert!(!error.message.is_empty());
    assert!(!rejected.stack().is_empty());
}

#[tokio::test]
async fn timeout_rejects_with_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let transport = HttpTransport::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let rejected = Client::new(transport)
        .request(server.uri())
        .get()
        .await
        .unwrap_err();

    let error = rejected.error().unwrap();
    assert_eq!(error.name, "TimeoutError");
    assert_eq!(error.code.as_deref(), Some("ETIMEDOUT"));
}

#[tokio::test]
async fn invalid_url_rejects_without_network() {
    let rejected = test_client()
        .request("not a url")
        .get()
        .await
        .unwrap_err();
    assert_eq!(rejected.error().unwrap().name, "BuilderError");
    assert_eq!(rejected.request().url, "not a url");
}

// -----------------------------------------------------------------------
// Cancellation
// -----------------------------------------------------------------------

#[tokio::test]
async fn canceller_aborts_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let started = Instant::now();
    let pending = test_client().request(server.uri()).get();
    let canceller = pending.canceller();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(canceller.cancel());
    });

    let rejected = pending.await.unwrap_err();
    assert!(rejected.is_cancelled());
    assert_eq!(rejected.error().unwrap().name, "AbortError");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn cancel_after_settle_is_a_noop() {
    let server = mock("GET", "/", 200, json!(1)).await;

    let pending = test_client().request(server.uri()).get();
    let canceller = pending.canceller();
    assert_eq!(pending.await.unwrap(), json!(1));
    assert!(!canceller.cancel());
}

// -----------------------------------------------------------------------
// Reuse
// -----------------------------------------------------------------------

#[tokio::test]
async fn cloned_builder_sends_identical_requests() {
    let server = mock("GET", "/a/b", 200, json!(null)).await;

    let rb = test_client()
        .request(server.uri())
        .header("x", "1")
        .path(["a", "b"])
        .query("q", "v");
    rb.clone().get().await.unwrap();
    rb.get().await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].url, received[1].url);
    assert_eq!(received[0].headers.get("x"), received[1].headers.get("x"));
}

#[tokio::test]
async fn concurrent_requests() {
    let server = mock("GET", "/", 200, json!("ok")).await;
    let client = test_client();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pending = client.request(server.uri()).query("i", i).get();
            tokio::spawn(pending)
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), json!("ok"));
    }
}

#[test]
fn blocking_runtime_drives_a_request() {
    let rt = reqline::runtime().unwrap();
    let server = rt.block_on(mock("GET", "/", 200, json!("sync")));
    let uri = server.uri();

    let body = rt
        .block_on(async { test_client().request(uri).get().await })
        .unwrap();
    assert_eq!(body, json!("sync"));
}
