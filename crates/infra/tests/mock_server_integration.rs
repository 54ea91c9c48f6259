//! Integration tests for the stub server
//!
//! Drives the harness's own [`MockServer`] through the dispatcher, so both
//! sides of each exchange are restprobe code.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use restprobe_core::RequestOptions;
use restprobe_domain::{ExpectedCount, ProbeError, Properties, ResponseClass, Settings};
use restprobe_infra::{ConfigSource, Dispatcher, HttpClient, MockServer};
use serde_json::json;

async fn started() -> (MockServer, Dispatcher) {
    let server = MockServer::new(0);
    server.start().await.expect("start mock server");

    let mut props = Properties::new();
    props.insert("base.uri".into(), server.base_url().expect("running"));
    let settings = Settings::from_properties("qa", props).expect("settings");
    let dispatcher = Dispatcher::new(
        Arc::new(ConfigSource::from_settings(settings)),
        HttpClient::new().expect("http client"),
    );
    (server, dispatcher)
}

#[tokio::test]
async fn test_stubbed_verbs_round_trip() {
    let (server, api) = started().await;
    server
        .stub_json(Method::GET, "/users/2", 200, &json!({"data": {"id": 2, "first_name": "Janet"}}))
        .await
        .expect("stub get");
    server.stub(Method::POST, "/users", 201, r#"{"id":"99"}"#).await.expect("stub post");
    server.stub(Method::DELETE, "/users/2", 204, "").await.expect("stub delete");

    let resp = api.get("/users/2").await.expect("get");
    resp.expect_class(ResponseClass::Ok).expect("ok");
    assert_eq!(resp.value_at("data.first_name").expect("json"), Some(json!("Janet")));

    let resp = api.post("/users", &json!({"name": "neo"})).await.expect("post");
    assert!(resp.matches(ResponseClass::Created));

    let resp = api.delete("/users/2").await.expect("delete");
    assert_eq!(resp.status(), 204);
    assert!(resp.matches(ResponseClass::Success));

    server.verify_request(Method::GET, "/users/2").await.expect("get seen");
    server.verify_request_count(Method::POST, "/users", 1).await.expect("one post");
    server.verify_request_count(Method::PUT, "/users/2", 0).await.expect("no put");

    let err = server.verify_request(Method::PATCH, "/users/2").await.unwrap_err();
    assert!(matches!(
        err,
        ProbeError::Verification { expected: ExpectedCount::AtLeastOnce, actual: 0, .. }
    ));
}

#[tokio::test]
async fn test_unmatched_request_is_404() {
    let (_server, api) = started().await;
    let resp = api.get("/nothing-here").await.expect("response");
    assert_eq!(resp.status(), 404);
    assert!(!resp.matches(ResponseClass::Success));
}

#[tokio::test]
async fn test_delay_trips_dispatcher_timeout() {
    let (server, api) = started().await;
    server
        .stub_with_delay(Method::GET, "/slow", 200, "{}", Duration::from_millis(400))
        .await
        .expect("stub");

    let err = api
        .get_with("/slow", RequestOptions::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Timeout(_)));

    let resp = api
        .get_with("/slow", RequestOptions::new().timeout(Duration::from_secs(5)))
        .await
        .expect("slow but in time");
    assert!(resp.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_fault_returns_500_text() {
    let (server, api) = started().await;
    server.stub_with_fault(Method::POST, "/users", "EMPTY_RESPONSE").await.expect("stub");

    let resp = api.post("/users", &json!({})).await.expect("response");
    assert_eq!(resp.status(), 500);
    assert_eq!(resp.body(), "Simulated fault: EMPTY_RESPONSE");
    assert!(resp.expect_class(ResponseClass::Success).is_err());
}

#[tokio::test]
async fn test_body_query_and_header_conditions() {
    let (server, api) = started().await;
    server
        .stub_with_body_matching(
            Method::POST,
            "/login",
            r#".*"email":"eve\.holt@reqres\.in".*"#,
            200,
            r#"{"token":"QpwL5tke4Pnpja7X4"}"#,
        )
        .await
        .expect("body stub");
    server
        .stub_with_query_params(Method::GET, "/users", &[("page", "2")], 200, r#"{"page":2}"#)
        .await
        .expect("query stub");
    server
        .stub_with_headers(Method::GET, "/private", &[("x-api-key", "secret")], 200, "{}")
        .await
        .expect("header stub");

    let ok = api
        .post("/login", &json!({"email": "eve.holt@reqres.in", "password": "x"}))
        .await
        .expect("login");
    assert_eq!(ok.value_at("token").expect("json"), Some(json!("QpwL5tke4Pnpja7X4")));
    let miss = api.post("/login", &json!({"email": "someone@else"})).await.expect("login miss");
    assert_eq!(miss.status(), 404);

    // Path match with extra parameters still satisfied.
    let page = api
        .get_with("/users", RequestOptions::new().query("page", "2").query("per_page", "6"))
        .await
        .expect("page");
    assert_eq!(page.status(), 200);
    let wrong_page =
        api.get_with("/users", RequestOptions::new().query("page", "3")).await.expect("page 3");
    assert_eq!(wrong_page.status(), 404);

    let denied = api.get("/private").await.expect("no header");
    assert_eq!(denied.status(), 404);
    let allowed = api
        .get_with("/private", RequestOptions::new().header("X-Api-Key", "secret"))
        .await
        .expect("with header");
    assert_eq!(allowed.status(), 200);

    server.verify_request_count(Method::POST, "/login", 2).await.expect("two logins");
    server.verify_request_count(Method::GET, "/users?page=2&per_page=6", 1).await.expect("exact url");
}

#[tokio::test]
async fn test_reset_and_stop() {
    let (server, api) = started().await;
    server.stub(Method::GET, "/ping", 200, "{}").await.expect("stub");
    assert_eq!(api.get("/ping").await.expect("ping").status(), 200);

    server.reset().await;
    server.verify_request_count(Method::GET, "/ping", 0).await.expect("history cleared");
    assert_eq!(api.get("/ping").await.expect("ping").status(), 404);

    server.stop();
    assert!(!server.is_running());
    assert!(matches!(
        server.stub(Method::GET, "/ping", 200, "{}").await,
        Err(ProbeError::MockServer(_))
    ));
}
