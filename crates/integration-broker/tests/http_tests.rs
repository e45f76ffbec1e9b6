//! HTTP surface tests using axum's Router directly.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use url::form_urlencoded::byte_serialize;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use integration_broker::cache::{EphemeralCache, MemoryCache};
use integration_broker::client::UpstreamClient;
use integration_broker::config::Config;
use integration_broker::oauth::CredentialBroker;
use integration_broker::server::AppState;
use integration_broker::server::routes::create_router;

const IDS: &[(&str, &str)] = &[("user_id", "u1"), ("org_id", "o1")];

fn build_router(config: &Config) -> (axum::Router, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let broker = CredentialBroker::new(cache.clone());
    let client = UpstreamClient::new(config).unwrap();
    let state = AppState::new(config, broker, client).unwrap();
    (create_router(Arc::new(state)), cache)
}

fn unused() -> Config {
    Config::for_testing("http://unused.localhost")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn form_post(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(serde_urlencoded::to_string(fields).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_ping_and_health() {
    let (app, _) = build_router(&unused());

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"Ping": "Pong"}));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["cache"], "memory");
    assert_eq!(
        health["providers"],
        json!(["notion", "airtable", "hubspot"])
    );
}

#[tokio::test]
async fn test_unknown_provider_is_404() {
    let (app, _) = build_router(&unused());

    let request = form_post("/integrations/dropbox/authorize", IDS);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "Integration not supported"})
    );
}

#[tokio::test]
async fn test_unconfigured_provider_is_404() {
    let config = Config {
        hubspot: None,
        ..unused()
    };
    let (app, _) = build_router(&config);

    let request = form_post("/integrations/hubspot/authorize", IDS);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authorize_returns_url() {
    let config = Config::for_testing("http://mock.localhost");
    let (app, cache) = build_router(&config);

    let request = form_post("/integrations/airtable/authorize", IDS);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let url = body_json(response).await;
    let url = url.as_str().unwrap();
    assert!(url.starts_with("http://mock.localhost/airtable/authorize?"));
    let stored = cache.get("airtable_state:o1:u1").await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_authorize_requires_ids() {
    let (app, _) = build_router(&unused());

    let request = form_post("/integrations/notion/authorize", &[("user_id", "u1")]);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "Invalid request: org_id is required"})
    );
}

#[tokio::test]
async fn test_callback_errors_are_400() {
    let (app, _) = build_router(&unused());

    let denied = "/integrations/notion/oauth2callback?error=access_denied&state=x";
    let response = app.clone().oneshot(get(denied)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "access_denied"})
    );

    let garbage = "/integrations/notion/oauth2callback?code=c&state=bm90LWpzb24";
    let response = app.oneshot(get(garbage)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "State does not match."})
    );
}

#[tokio::test]
async fn test_callback_without_state_is_invalid_request() {
    let (app, _) = build_router(&unused());

    let uri = "/integrations/notion/oauth2callback?code=c";
    let response = app.oneshot(get(uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "Invalid request: missing state"})
    );
}

#[tokio::test]
async fn test_callback_success_closes_window() {
    let server = MockServer::start().await;
    let token = json!({"access_token": "t"});
    Mock::given(method("POST"))
        .and(path("/hubspot/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&token))
        .mount(&server)
        .await;
    let (app, _) = build_router(&Config::for_testing(&server.uri()));

    let request = form_post("/integrations/hubspot/authorize", IDS);
    let response = app.clone().oneshot(request).await.unwrap();
    let url = body_json(response).await.as_str().unwrap().to_string();
    let state = url::Url::parse(&url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let state: String = byte_serialize(state.as_bytes()).collect();
    let query = format!("code=abc&state={state}");
    let callback = format!("/integrations/hubspot/oauth2callback?{query}");
    let response = app.clone().oneshot(get(&callback)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("window.close()"));

    let request = form_post("/integrations/hubspot/credentials", IDS);
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, token);

    let request = form_post("/integrations/hubspot/credentials", IDS);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "No credentials found."})
    );
}

#[tokio::test]
async fn test_corrupted_credentials_are_500() {
    let (app, cache) = build_router(&unused());
    let blob = b"{not json".to_vec();
    cache
        .set("notion_credentials:o1:u1", blob, Duration::from_secs(60))
        .await
        .unwrap();

    let request = form_post("/integrations/notion/credentials", IDS);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"detail": "Corrupted credentials data."})
    );
}

#[tokio::test]
async fn test_load_rejects_bad_blob() {
    let (app, _) = build_router(&unused());

    let request = form_post("/integrations/hubspot/load", &[("credentials", "nope")]);
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = form_post("/integrations/hubspot/load", &[]);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_load_returns_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hubspot/api/crm/v3/objects/companies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "7", "properties": {"name": "Initech"}}]
        })))
        .mount(&server)
        .await;
    let (app, _) = build_router(&Config::for_testing(&server.uri()));

    let credentials = r#"{"access_token":"t"}"#;
    let request = form_post(
        "/integrations/hubspot/load",
        &[("credentials", credentials)],
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let items = body_json(response).await;
    assert_eq!(items[0]["id"], "7");
    assert_eq!(items[0]["name"], "Initech");
    assert_eq!(items[0]["type"], "Company");
    assert_eq!(items[0]["visibility"], true);
}

#[tokio::test]
async fn test_cors_allows_frontend_origin() {
    let (app, _) = build_router(&unused());
    let frontend = "http://localhost:3000";

    let request = Request::get("/")
        .header("origin", frontend)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], frontend);
    assert_eq!(headers["access-control-allow-credentials"], "true");
}
