// ---------------------------------------------------------------------------
// handlers/: HTTP surface next to the MCP endpoint
// Sub-modules for logical grouping; mod.rs re-exports all public items
// so that `crate::handlers::*` paths stay flat in lib.rs.
// ---------------------------------------------------------------------------

// Sub-modules are pub(crate) so utoipa __path_* types are accessible from lib.rs OpenApi derive.
pub(crate) mod crm_auth;
pub(crate) mod luna;
pub(crate) mod system;

// ── Re-exports ───────────────────────────────────────────────────────────────

pub use crm_auth::{auth_logout, auth_refresh, auth_status, store_code};
pub use luna::{call_luna_alias, call_luna_tool, list_luna_tools};
pub use system::{health, readiness};

// ── utoipa __path_* re-exports ───────────────────────────────────────────────
// The #[utoipa::path] attribute macro generates private structs like __path_health.
// The OpenApi derive in lib.rs expects them at `handlers::__path_health`, so we
// re-export them here.
pub use crm_auth::{__path_auth_logout, __path_auth_refresh, __path_auth_status, __path_store_code};
pub use luna::{__path_call_luna_alias, __path_call_luna_tool, __path_list_luna_tools};
pub use system::{__path_health, __path_readiness};

// ── Shared types ─────────────────────────────────────────────────────────────

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::CrmError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Centralized API error type for all handlers.
/// Logs full details server-side, returns sanitized JSON to the client.
///
/// Response format (structured):
/// ```json
/// {
///   "error": {
///     "code": "BAD_REQUEST",
///     "message": "Human-readable description",
///     "request_id": "uuid",
///     "details": { ... }       // optional, null when absent
///   }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),
}

impl ApiError {
    /// Machine-readable error code string for each variant.
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unprocessable(_) => "VALIDATION_ERROR",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::RateLimited(_) => "RATE_LIMITED",
        }
    }

    /// HTTP status code for each variant.
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Sanitized message safe to return to clients. Only `Internal` and
    /// `Unavailable` (cache backend failures) hide their detail.
    pub(crate) fn sanitized_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            ApiError::Unavailable(_) => "Cache backend unavailable".to_string(),
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Unprocessable(m)
            | ApiError::Upstream(m)
            | ApiError::Unauthorized(m)
            | ApiError::RateLimited(m) => m.clone(),
        }
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        let message = err.to_string();
        match err {
            CrmError::Authentication(_) | CrmError::Token(_) => ApiError::Unauthorized(message),
            CrmError::NotFound { .. } => ApiError::NotFound(message),
            CrmError::Validation(_) => ApiError::Unprocessable(message),
            CrmError::RateLimit(_) => ApiError::RateLimited(message),
            CrmError::Cache(_) => ApiError::Unavailable(message),
            CrmError::ExternalApi { .. } => ApiError::Upstream(message),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let request_id = Uuid::new_v4().to_string();

        // Log full detail server-side (with request_id for correlation)
        tracing::error!(
            request_id = %request_id,
            code = self.error_code(),
            "API error ({}): {}",
            status.as_u16(),
            self
        );

        let body: Value = json!({
            "error": {
                "code": self.error_code(),
                "message": self.sanitized_message(),
                "request_id": request_id,
                "details": null,
            }
        });
        (status, Json(body)).into_response()
    }
}
