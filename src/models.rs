use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub app: String,
    pub uptime_seconds: u64,
    /// CRM tenant sub-domain.
    pub dominio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub cache: bool,
    pub uptime_seconds: u64,
}

// ---------------------------------------------------------------------------
// Luna mirror
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LunaCallRequest {
    /// Tool name, e.g. `luna_identificar_cliente`.
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LunaCallResponse {
    pub success: bool,
    pub tool: String,
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LunaFailure {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LunaToolInfo {
    pub name: String,
    /// Path segment accepted by `POST /api/luna/{alias}`.
    pub alias: String,
    pub description: String,
    pub method: String,
    #[schema(value_type = Object)]
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LunaToolList {
    pub tools: Vec<LunaToolInfo>,
}

// ---------------------------------------------------------------------------
// Auth administration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerificationCodeRequest {
    /// Code received by e-mail or SMS.
    pub code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthActionResponse {
    pub success: bool,
    pub message: String,
}
