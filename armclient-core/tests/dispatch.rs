//! Integration tests for request dispatch.
//!
//! These tests verify:
//! - Non-success statuses come back as results, not errors
//! - Bodies are only sent for PUT, POST and PATCH, byte for byte
//! - Default headers and caller header overlay
//! - Input problems are reported before any network call

mod common;

use std::io::Write;
use std::sync::Arc;

use armclient_core::{
    ErrorKind, HeaderPair, InputError, MemorySettingsStore, RequestDispatcher, RequestSpec,
    TenantSelector, UrlResolver, Verb, read_body_argument,
};
use common::{client_with_cached_token, valid_credential};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_bytes, body_string, header, method, path, query_param},
};

#[tokio::test]
async fn test_not_found_is_a_result() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": "SubscriptionNotFound", "message": "not found" }
        })))
        .mount(&mock_server)
        .await;

    let (client, _) =
        client_with_cached_token(&mock_server, Arc::new(MemorySettingsStore::new()), "common")
            .await;

    let spec = RequestSpec::new(Verb::Get, "subscriptions/missing?api-version=2020-01-01");
    let response = client.request(&spec, &TenantSelector::Current).await.unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
    assert!(response.body_text().contains("SubscriptionNotFound"));
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let mock_server = MockServer::start().await;
    let (client, credential) =
        client_with_cached_token(&mock_server, Arc::new(MemorySettingsStore::new()), "common")
            .await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .and(query_param("api-version", "2020-01-01"))
        .and(header("authorization", credential.bearer().as_str()))
        .and(header("x-ms-client-request-id", "test-correlation"))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ms-request-id", "abc")
                .set_body_string(r#"{"value":[]}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::new(Verb::Get, "/subscriptions?api-version=2020-01-01");
    let response = client.request(&spec, &TenantSelector::Current).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.header("X-MS-Request-Id"), Some("abc"));
    assert_eq!(response.body, br#"{"value":[]}"#);
}

#[tokio::test]
async fn test_get_never_carries_a_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/providers"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dispatcher = RequestDispatcher::new(
        reqwest::Client::new(),
        UrlResolver::parse(&mock_server.uri()).unwrap(),
    );
    let spec = RequestSpec::new(Verb::Get, "/providers").with_body(r#"{"ignored":true}"#);

    let response = dispatcher
        .dispatch(&spec, &valid_credential("common"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_put_body_is_sent_unmodified() {
    let mock_server = MockServer::start().await;
    let body = "{ \"location\" :\n  \"westus\" }";

    Mock::given(method("PUT"))
        .and(path("/subscriptions/s/resourcegroups/rg"))
        .and(body_bytes(body.as_bytes()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dispatcher = RequestDispatcher::new(
        reqwest::Client::new(),
        UrlResolver::parse(&mock_server.uri()).unwrap(),
    );
    let spec = RequestSpec::new(Verb::Put, "/subscriptions/s/resourcegroups/rg").with_body(body);

    let response = dispatcher
        .dispatch(&spec, &valid_credential("common"))
        .await
        .unwrap();
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_malformed_json_body_is_not_rejected_client_side() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/action"))
        .and(body_string("{not json"))
        .respond_with(ResponseTemplate::new(400).set_body_string("InvalidRequestContent"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dispatcher = RequestDispatcher::new(
        reqwest::Client::new(),
        UrlResolver::parse(&mock_server.uri()).unwrap(),
    );
    let spec = RequestSpec::new(Verb::Post, "/action").with_body("{not json");

    let response = dispatcher
        .dispatch(&spec, &valid_credential("common"))
        .await
        .unwrap();
    assert_eq!(response.status, 400);
    assert_eq!(response.body_text(), "InvalidRequestContent");
}

#[tokio::test]
async fn test_caller_headers_override_defaults() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/resource"))
        .and(header("content-type", "application/merge-patch+json"))
        .and(header("x-ms-client-request-id", "caller-id"))
        .and(header("if-match", "second"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dispatcher = RequestDispatcher::new(
        reqwest::Client::new(),
        UrlResolver::parse(&mock_server.uri()).unwrap(),
    );
    let headers = [
        "Content-Type=application/merge-patch+json",
        "x-ms-client-request-id=caller-id",
        "If-Match=first",
        "If-Match=second",
    ]
    .into_iter()
    .map(HeaderPair::parse)
    .collect::<Result<Vec<_>, _>>()
    .unwrap();
    let spec = RequestSpec::new(Verb::Patch, "/resource")
        .with_body("{}")
        .with_headers(headers);

    let response = dispatcher
        .dispatch(&spec, &valid_credential("common"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[test]
fn test_missing_body_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let err = read_body_argument(&format!("@{}", missing.display())).unwrap_err();
    assert!(matches!(err, InputError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_body_file_contents_are_sent() {
    let mock_server = MockServer::start().await;
    let contents = b"{\"properties\":{\"displayName\":\"dev\"}}\n";

    Mock::given(method("PUT"))
        .and(path("/resource"))
        .and(body_bytes(&contents[..]))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();

    let body = read_body_argument(&format!("@\"{}\"", file.path().display())).unwrap();
    let dispatcher = RequestDispatcher::new(
        reqwest::Client::new(),
        UrlResolver::parse(&mock_server.uri()).unwrap(),
    );
    let spec = RequestSpec::new(Verb::Put, "resource").with_body(body.into_bytes());

    let response = dispatcher
        .dispatch(&spec, &valid_credential("common"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_empty_path_fails_before_authentication() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    // no cached token for this tenant, so authenticating would hit the broker
    let (client, _) =
        client_with_cached_token(&mock_server, Arc::new(MemorySettingsStore::new()), "other")
            .await;

    let err = client
        .request(&RequestSpec::new(Verb::Get, "  "), &TenantSelector::Current)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_transport_failure_is_a_network_error() {
    let dispatcher = RequestDispatcher::new(
        reqwest::Client::new(),
        UrlResolver::parse("http://127.0.0.1:1").unwrap(),
    );

    let err = dispatcher
        .dispatch(
            &RequestSpec::new(Verb::Get, "/subscriptions"),
            &valid_credential("common"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}
