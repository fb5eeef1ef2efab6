// Health, readiness and inbound-auth integration tests.
// The CRM is never contacted here: the base URL points at a closed port.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use cvcrm_mcp::cache::{CacheKeys, MemoryStore};
use cvcrm_mcp::config::CrmConfig;
use cvcrm_mcp::state::AppState;

fn test_state(auth_secret: Option<&str>) -> AppState {
    let config = CrmConfig {
        domain: "acme".into(),
        user: "ops@acme.com.br".into(),
        cpf: "12345678901".into(),
        verification_code: None,
        base_url: "http://127.0.0.1:9".into(),
    };
    AppState::new(
        Arc::new(MemoryStore::new()),
        CacheKeys::default(),
        config,
        reqwest::Client::new(),
        auth_secret.map(String::from),
    )
}

fn test_app(state: AppState) -> axum::Router {
    cvcrm_mcp::create_router(state)
}

/// Collect a response body into a `serde_json::Value`.
async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let state = test_state(None);
    state.mark_ready();
    let response = test_app(state).oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["app"], "CV CRM MCP Server");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["dominio"], "acme");
}

#[tokio::test]
async fn health_reports_starting_before_ready() {
    let response = test_app(test_state(None))
        .oneshot(get("/api/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "starting");
}

#[tokio::test]
async fn readiness_is_503_until_marked_ready() {
    let state = test_state(None);
    let app = test_app(state.clone());

    let response = app.clone().oneshot(get("/api/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
    assert_eq!(json["cache"], true);

    state.mark_ready();
    let response = app.oneshot(get("/api/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = test_app(test_state(None))
        .oneshot(get("/api/docs/openapi.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/api/luna/{alias}"].is_object());
}

#[tokio::test]
async fn nonexistent_route_returns_404() {
    let response = test_app(test_state(None))
        .oneshot(get("/api/does-not-exist"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── AUTH_SECRET ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_require_bearer_when_secret_is_set() {
    let app = test_app(test_state(Some("s3cret")));

    let response = app.clone().oneshot(get("/api/luna")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/luna")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .uri("/api/luna")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(right).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_stays_public_when_secret_is_set() {
    let response = test_app(test_state(Some("s3cret")))
        .oneshot(get("/api/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mcp_endpoint_requires_bearer_when_secret_is_set() {
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
        .unwrap();
    let response = test_app(test_state(Some("s3cret")))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
