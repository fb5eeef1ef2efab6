// ---------------------------------------------------------------------------
// handlers/luna.rs: HTTP mirror of the Luna tools for automation platforms
// ---------------------------------------------------------------------------

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use super::ApiError;
use crate::error::CrmError;
use crate::models::{LunaCallRequest, LunaCallResponse, LunaFailure, LunaToolInfo, LunaToolList};
use crate::state::AppState;
use crate::tools::{self, luna};

fn unknown_tool(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Unknown tool: {}", name) })),
    )
        .into_response()
}

fn failure_status(err: &CrmError) -> StatusCode {
    ApiError::from(err.clone()).status_code()
}

/// GET /api/luna: the tools reachable through the mirror.
#[utoipa::path(get, path = "/api/luna", tag = "luna",
    responses((status = 200, description = "Luna tools and their aliases", body = LunaToolList))
)]
pub async fn list_luna_tools() -> Json<LunaToolList> {
    let tools = luna::definitions()
        .into_iter()
        .filter_map(|def| {
            let name = def.get("name")?.as_str()?.to_string();
            let alias = luna::ALIASES
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(a, _)| a.to_string())?;
            Some(LunaToolInfo {
                alias,
                description: def["description"].as_str().unwrap_or_default().to_string(),
                method: "POST".to_string(),
                parameters: def["inputSchema"].clone(),
                name,
            })
        })
        .collect();
    Json(LunaToolList { tools })
}

/// POST /api/luna: `{ tool, arguments }` envelope.
#[utoipa::path(post, path = "/api/luna", tag = "luna",
    request_body = LunaCallRequest,
    responses(
        (status = 200, description = "Tool result", body = LunaCallResponse),
        (status = 400, description = "Tool name missing", body = Value),
        (status = 404, description = "Unknown tool", body = Value),
        (status = 422, description = "Invalid arguments", body = LunaFailure)
    )
)]
pub async fn call_luna_tool(
    State(state): State<AppState>,
    Json(req): Json<LunaCallRequest>,
) -> Response {
    let Some(tool) = req.tool.filter(|t| !t.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Tool name is required" })),
        )
            .into_response();
    };
    if !luna::is_luna_tool(&tool) {
        return unknown_tool(&tool);
    }

    tracing::info!(tool = %tool, "Luna API call");

    match tools::execute_tool(&state.client, &tool, req.arguments).await {
        Ok(output) => Json(LunaCallResponse {
            success: true,
            tool,
            data: output.into_value(),
        })
        .into_response(),
        Err(e) => (
            failure_status(&e),
            Json(LunaFailure {
                success: false,
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /api/luna/{alias}: body is the tool arguments, response is the bare result.
#[utoipa::path(post, path = "/api/luna/{alias}", tag = "luna",
    params(("alias" = String, Path, description = "Kebab-case alias, e.g. identificar-cliente")),
    request_body = Value,
    responses(
        (status = 200, description = "Tool result", body = Value),
        (status = 404, description = "Unknown alias", body = Value)
    )
)]
pub async fn call_luna_alias(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Json(args): Json<Value>,
) -> Response {
    let Some(tool) = luna::tool_for_alias(&alias) else {
        return unknown_tool(&alias);
    };

    tracing::info!(tool = %tool, alias = %alias, "Luna tool call via HTTP");

    match tools::execute_tool(&state.client, tool, args).await {
        Ok(output) => Json(output.into_value()).into_response(),
        Err(e) => (failure_status(&e), Json(json!({ "error": e.to_string() }))).into_response(),
    }
}
