// ---------------------------------------------------------------------------
// handlers/crm_auth.rs: CRM token administration
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::State;

use super::ApiError;
use crate::crm::AuthStatus;
use crate::error::CrmError;
use crate::models::{AuthActionResponse, VerificationCodeRequest};
use crate::state::AppState;

#[utoipa::path(get, path = "/api/auth/status", tag = "auth",
    responses((status = 200, description = "Cached token state", body = AuthStatus))
)]
pub async fn auth_status(State(state): State<AppState>) -> Result<Json<AuthStatus>, ApiError> {
    Ok(Json(state.auth.status().await?))
}

/// POST /api/auth/code: webhook that hands a verification code to the
/// next login. The code is read once and then discarded.
#[utoipa::path(post, path = "/api/auth/code", tag = "auth",
    request_body = VerificationCodeRequest,
    responses(
        (status = 200, description = "Code stored", body = AuthActionResponse),
        (status = 422, description = "Empty code")
    )
)]
pub async fn store_code(
    State(state): State<AppState>,
    Json(req): Json<VerificationCodeRequest>,
) -> Result<Json<AuthActionResponse>, ApiError> {
    let code = req.code.trim();
    if code.is_empty() {
        return Err(CrmError::Validation("code must not be empty".to_string()).into());
    }
    state.auth.store_verification_code(code).await?;
    tracing::info!("verification code received via webhook");
    Ok(Json(AuthActionResponse {
        success: true,
        message: "Verification code stored".to_string(),
    }))
}

#[utoipa::path(post, path = "/api/auth/refresh", tag = "auth",
    responses(
        (status = 200, description = "New token issued", body = AuthActionResponse),
        (status = 401, description = "Login failed")
    )
)]
pub async fn auth_refresh(
    State(state): State<AppState>,
) -> Result<Json<AuthActionResponse>, ApiError> {
    state.auth.refresh_token().await?;
    Ok(Json(AuthActionResponse {
        success: true,
        message: "Token renewed".to_string(),
    }))
}

#[utoipa::path(post, path = "/api/auth/logout", tag = "auth",
    responses((status = 200, description = "Cached token discarded", body = AuthActionResponse))
)]
pub async fn auth_logout(
    State(state): State<AppState>,
) -> Result<Json<AuthActionResponse>, ApiError> {
    state.auth.invalidate_token().await?;
    Ok(Json(AuthActionResponse {
        success: true,
        message: "Token invalidated".to_string(),
    }))
}
