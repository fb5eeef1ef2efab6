// ---------------------------------------------------------------------------
// handlers/system.rs: Health and readiness
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::config::{APP_NAME, APP_VERSION};
use crate::models::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

#[utoipa::path(get, path = "/api/health", tag = "health",
    responses((status = 200, description = "Liveness with version and tenant", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.is_ready() { "ok" } else { "starting" }.to_string(),
        version: APP_VERSION.to_string(),
        app: APP_NAME.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        dominio: state.domain().to_string(),
    })
}

/// GET /api/health/ready: ready once startup finished and the cache answers a ping.
#[utoipa::path(get, path = "/api/health/ready", tag = "health",
    responses(
        (status = 200, description = "Service ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> axum::response::Response {
    let cache = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("readiness: cache ping failed: {}", e);
            false
        }
    };
    let ready = state.is_ready() && cache;
    let body = ReadinessResponse {
        ready,
        cache,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    if ready {
        (StatusCode::OK, Json(body)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
