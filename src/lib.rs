pub mod auth;
pub mod cache;
pub mod config;
pub mod crm;
pub mod error;
pub mod handlers;
pub mod mcp;
pub mod models;
pub mod state;
pub mod tools;

use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use utoipa::OpenApi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CV CRM MCP Server",
        description = "MCP bridge and HTTP mirror for the CV CRM real-estate API"
    ),
    paths(
        handlers::health,
        handlers::readiness,
        handlers::list_luna_tools,
        handlers::call_luna_tool,
        handlers::call_luna_alias,
        handlers::auth_status,
        handlers::store_code,
        handlers::auth_refresh,
        handlers::auth_logout,
    ),
    components(schemas(
        models::HealthResponse,
        models::ReadinessResponse,
        models::LunaCallRequest,
        models::LunaCallResponse,
        models::LunaFailure,
        models::LunaToolInfo,
        models::LunaToolList,
        models::VerificationCodeRequest,
        models::AuthActionResponse,
        crm::AuthStatus,
    )),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "luna", description = "Luna customer-assistant tools over plain HTTP"),
        (name = "auth", description = "CRM token administration"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/health/ready", get(handlers::readiness))
        .route("/api/docs/openapi.json", get(openapi_json));

    let protected = Router::new()
        // MCP JSON-RPC
        .route("/mcp", post(mcp::server::mcp_handler))
        // Luna mirror
        .route("/api/luna", get(handlers::list_luna_tools).post(handlers::call_luna_tool))
        .route("/api/luna/{alias}", post(handlers::call_luna_alias))
        // CRM token administration
        .route("/api/auth/status", get(handlers::auth_status))
        .route("/api/auth/code", post(handlers::store_code))
        .route("/api/auth/refresh", post(handlers::auth_refresh))
        .route("/api/auth/logout", post(handlers::auth_logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    public.merge(protected).with_state(state)
}
