//! Integration tests for the request dispatcher
//!
//! Each test points a dispatcher at a fresh wiremock server and checks what
//! actually went over the wire: auth headers per mode, JSON bodies, query
//! parameters, timeouts and response classification.

use std::sync::Arc;
use std::time::Duration;

use restprobe_common::{MockClock, TokenManager};
use restprobe_core::RequestOptions;
use restprobe_domain::{AuthMode, ProbeError, Properties, ResponseClass, Settings};
use restprobe_infra::{ConfigSource, Dispatcher, Harness, HttpClient};
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "dispatch-secret-0123456789abcdefgh";

fn settings(base_uri: &str, extra: &[(&str, &str)]) -> Settings {
    let mut props = Properties::new();
    props.insert("base.uri".into(), base_uri.into());
    for (key, value) in extra {
        props.insert((*key).into(), (*value).into());
    }
    Settings::from_properties("qa", props).expect("settings")
}

fn dispatcher(settings: Settings) -> Dispatcher {
    Dispatcher::new(
        Arc::new(ConfigSource::from_settings(settings)),
        HttpClient::new().expect("http client"),
    )
}

fn json_ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn received_header(server: &MockServer, name: &str) -> Option<String> {
    let requests = server.received_requests().await.expect("recording enabled");
    let last = requests.last().expect("a request was received");
    last.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

#[tokio::test]
async fn test_get_without_auth_sends_json_headers_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/2"))
        .and(header("accept", "application/json"))
        .respond_with(json_ok(json!({"data": {"id": 2}})))
        .expect(1)
        .mount(&server)
        .await;

    let api = dispatcher(settings(&format!("{}/api", server.uri()), &[]));
    let resp = api.get("/users/2").await.expect("response");

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.method(), "GET");
    assert!(resp.url().ends_with("/api/users/2"));
    assert!(resp.matches(ResponseClass::Ok));
    assert_eq!(resp.value_at("data.id").expect("json"), Some(json!(2)));
    assert!(received_header(&server, "authorization").await.is_none());
    assert_eq!(received_header(&server, "content-type").await.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_bearer_request_carries_current_token() {
    let server = MockServer::start().await;
    let clock = MockClock::new();
    let tokens = Arc::new(
        TokenManager::new(SECRET.as_bytes(), Duration::from_secs(60), Duration::from_secs(10))
            .expect("token manager")
            .with_clock(Arc::new(clock.clone())),
    );
    let token = tokens.generate("eve", "admin").expect("generate");

    Mock::given(method("GET"))
        .and(path("/users/2"))
        .and(header("authorization", format!("Bearer {}", token.as_str()).as_str()))
        .respond_with(json_ok(json!({"data": {"id": 2}})))
        .expect(1)
        .mount(&server)
        .await;

    let api = dispatcher(settings(&server.uri(), &[("auth.type", "bearer"), ("jwt.secret", SECRET)]))
        .with_token_source(tokens.clone());
    let resp = api.get("/users/2").await.expect("response");
    resp.expect_class(ResponseClass::Success).expect("success");

    // Dispatching never touches the manager's state.
    assert_eq!(tokens.current_token().as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn test_expired_token_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(json_ok(json!({}))).expect(0).mount(&server).await;

    let clock = MockClock::new();
    let tokens = Arc::new(
        TokenManager::new(SECRET.as_bytes(), Duration::from_secs(5), Duration::from_secs(1))
            .expect("token manager")
            .with_clock(Arc::new(clock.clone())),
    );
    tokens.generate("eve", "admin").expect("generate");
    clock.advance(Duration::from_secs(6));

    let api = dispatcher(settings(&server.uri(), &[("auth.type", "bearer"), ("jwt.secret", SECRET)]))
        .with_token_source(tokens.clone());
    let err = api.get("/users/2").await.unwrap_err();
    assert!(matches!(err, ProbeError::TokenExpired(_)));

    // After renewal the same dispatcher works again.
    tokens.renew().expect("renew");
    server.reset().await;
    Mock::given(method("GET")).respond_with(json_ok(json!({}))).expect(1).mount(&server).await;
    api.get("/users/2").await.expect("response after renew");
}

#[tokio::test]
async fn test_basic_cookie_and_apikey_modes() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(json_ok(json!({}))).mount(&server).await;

    let api = dispatcher(settings(
        &server.uri(),
        &[
            ("auth.basic.username", "user"),
            ("auth.basic.password", "pass"),
            ("auth.cookie.name", "session"),
            ("auth.cookie.value", "abc123"),
            ("api.key.enabled", "true"),
            ("api.key.header", "x-api-key"),
            ("api.key.value", "reqres-free-v1"),
        ],
    ));

    api.with_auth(AuthMode::Basic).get("/a").await.expect("basic");
    // base64("user:pass")
    assert_eq!(received_header(&server, "authorization").await.as_deref(), Some("Basic dXNlcjpwYXNz"));

    api.with_auth(AuthMode::Cookie).get("/b").await.expect("cookie");
    assert_eq!(received_header(&server, "cookie").await.as_deref(), Some("session=abc123"));

    api.with_auth(AuthMode::ApiKey).get("/c").await.expect("apikey");
    assert_eq!(received_header(&server, "x-api-key").await.as_deref(), Some("reqres-free-v1"));

    // Per-call override beats the dispatcher's mode.
    api.with_auth(AuthMode::Basic)
        .get_with("/d", RequestOptions::new().auth(AuthMode::None))
        .await
        .expect("override");
    assert!(received_header(&server, "authorization").await.is_none());
}

#[tokio::test]
async fn test_bearer_without_token_source_is_config_error() {
    let api = dispatcher(settings("http://127.0.0.1:9", &[])).with_auth(AuthMode::Bearer);
    assert!(matches!(api.get("/x").await, Err(ProbeError::Config(_))));
}

#[tokio::test]
async fn test_json_verbs_and_classification() {
    let server = MockServer::start().await;
    let payload = json!({"name": "morpheus", "job": "leader"});

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"name": "morpheus", "job": "leader", "id": "42"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/2"))
        .respond_with(json_ok(json!({"updatedAt": "now"})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/2"))
        .respond_with(json_ok(json!({"updatedAt": "now"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/2"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let api = dispatcher(settings(&server.uri(), &[]));

    let created = api.post("/users", &payload).await.expect("post");
    created.expect_class(ResponseClass::Created).expect("created");
    assert!(!created.matches(ResponseClass::Ok));

    api.put("/users/2", &payload).await.expect("put").expect_class(ResponseClass::Ok).expect("ok");
    api.patch("/users/2", &json!({"job": "zion resident"}))
        .await
        .expect("patch")
        .expect_status(200)
        .expect("200");

    let deleted = api.delete("/users/2").await.expect("delete");
    assert!(deleted.is_empty());
    assert!(deleted.matches(ResponseClass::NoContent));
    assert!(deleted.matches(ResponseClass::Success));
    let err = deleted.expect_class(ResponseClass::Ok).unwrap_err();
    assert!(matches!(err, ProbeError::ClassificationMismatch { status: 204, .. }));
}

#[tokio::test]
async fn test_error_statuses_are_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let api = dispatcher(settings(&server.uri(), &[]));
    let resp = api.get("/users/23").await.expect("404 is a response");
    assert_eq!(resp.status(), 404);
    assert!(!resp.matches(ResponseClass::Success));
}

#[tokio::test]
async fn test_query_headers_and_text_body_options() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("page", "2"))
        .and(header("x-trace", "t-1"))
        .respond_with(json_ok(json!({"page": 2})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/raw"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let api = dispatcher(settings(&server.uri(), &[]));
    let resp = api
        .get_with("/users", RequestOptions::new().query("page", "2").header("X-Trace", "t-1"))
        .await
        .expect("query");
    assert_eq!(resp.value_at("page").expect("json"), Some(json!(2)));

    let options = RequestOptions::new().content_type("text/plain").text_body("plain text");
    let resp = api.send(reqwest::Method::POST, "/raw", None, options).await.expect("text");
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn test_timeout_is_distinct_from_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(json_ok(json!({})).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    // Per-call timeout.
    let api = dispatcher(settings(&server.uri(), &[]));
    let err = api
        .get_with("/slow", RequestOptions::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(d) if d == Duration::from_millis(50)));

    // Configured `api.timeout`.
    let api = dispatcher(settings(&server.uri(), &[("api.timeout", "50")]));
    assert!(matches!(api.get("/slow").await, Err(ProbeError::Timeout(_))));

    // Nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    let api = dispatcher(settings(&format!("http://127.0.0.1:{port}"), &[]));
    assert!(matches!(api.get("/x").await, Err(ProbeError::Transport(_))));
}

#[tokio::test]
async fn test_harness_uses_static_bearer_token_without_jwt_secret() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer opaque-token"))
        .respond_with(json_ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::from_settings(settings(
        &server.uri(),
        &[("auth.type", "bearer"), ("auth.bearer.token", "opaque-token")],
    ))
    .expect("harness");
    assert!(harness.tokens.is_none());
    harness.dispatcher.get("/me").await.expect("response");
}

#[tokio::test]
async fn test_form_body_and_path_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("name=morpheus&job=zion+leader"))
        .respond_with(json_ok(json!({"token": "t"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/2/posts/a%20b"))
        .respond_with(json_ok(json!({"id": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let api = dispatcher(settings(&server.uri(), &[]));
    let resp = api
        .post_form("/login", &[("name", "morpheus"), ("job", "zion leader")])
        .await
        .expect("form");
    assert_eq!(resp.value_at("token").expect("json"), Some(json!("t")));

    let options = RequestOptions::new().path_param("id", "2").path_param("slug", "a b");
    let resp = api.get_with("/users/{id}/posts/{slug}", options).await.expect("path params");
    assert_eq!(resp.status(), 200);

    let err = api.get("/users/{id}").await.unwrap_err();
    assert!(matches!(err, ProbeError::InvalidInput(_)));
    let err = api
        .get_with("/users", RequestOptions::new().path_param("id", "2"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::InvalidInput(_)));
}

#[tokio::test]
async fn test_harness_applies_http_client_settings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "suite-runner/1.0"))
        .and(header("x-suite", "smoke"))
        .respond_with(json_ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::from_settings(settings(
        &server.uri(),
        &[("http.user.agent", "suite-runner/1.0"), ("http.header.X-Suite", "smoke")],
    ))
    .expect("harness");
    harness.dispatcher.get("/ping").await.expect("response").expect_status(200).expect("200");
}
