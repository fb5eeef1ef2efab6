//! MCP server: the CRM tools and resources over JSON-RPC 2.0.
//!
//! `dispatch` is transport-agnostic; `mcp_handler` serves it over HTTP POST
//! at `/mcp` and [`super::stdio`] over line-delimited stdin/stdout.
//!
//! Supported methods:
//! - `initialize`: server info + capabilities
//! - `notifications/*`: accepted silently, never answered
//! - `tools/list`: list all available tools
//! - `tools/call`: execute a tool
//! - `resources/list`: list available resources
//! - `resources/read`: read a resource by URI
//! - `ping`: health check

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::config::{APP_NAME, APP_VERSION};
use crate::error::CrmResult;
use crate::state::AppState;
use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const RESOURCE_AUTH_STATUS: &str = "cvcrm://auth/status";
pub const RESOURCE_EMPREENDIMENTOS: &str = "cvcrm://empreendimentos";
pub const RESOURCE_CONFIG: &str = "cvcrm://config";

/// MCP JSON-RPC 2.0 endpoint handler.
pub async fn mcp_handler(
    State(state): State<AppState>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let response = dispatch(&state, &request).await.unwrap_or_else(|| json!({}));
    (StatusCode::OK, Json(response))
}

/// Route one JSON-RPC message. Returns `None` for notifications (no `id`,
/// or any `notifications/*` method), which never get a response.
pub async fn dispatch(state: &AppState, request: &Value) -> Option<Value> {
    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
    tracing::debug!(method = %method, "MCP server: incoming request");

    let Some(id) = request.get("id").cloned() else {
        return None;
    };
    if method.starts_with("notifications/") {
        return None;
    }

    let result = match method {
        "initialize" => handle_initialize(&id),
        "ping" => handle_ping(&id),
        "tools/list" => handle_tools_list(&id),
        "tools/call" => handle_tools_call(state, request, &id).await,
        "resources/list" => handle_resources_list(&id),
        "resources/read" => handle_resources_read(state, request, &id).await,
        _ => json_rpc_error(id, -32601, &format!("Method not found: {}", method)),
    };

    Some(result)
}

// ── initialize ──────────────────────────────────────────────────────────────

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            },
            "serverInfo": {
                "name": APP_NAME,
                "version": APP_VERSION
            },
            "instructions": "CV CRM real-estate back office: tickets, clients, reservations and sales (cvcrm_*), plus the Luna customer-assistant tools (luna_*)."
        }
    })
}

// ── ping ────────────────────────────────────────────────────────────────────

fn handle_ping(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {}
    })
}

// ── tools/list ──────────────────────────────────────────────────────────────

fn handle_tools_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": tools::definitions()
        }
    })
}

// ── tools/call ──────────────────────────────────────────────────────────────

async fn handle_tools_call(state: &AppState, request: &Value, id: &Value) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    if tool_name.is_empty() {
        return json_rpc_error(id.clone(), -32602, "Missing 'name' in params");
    }

    let (text, is_error) = match tools::execute_tool(&state.client, tool_name, arguments).await {
        Ok(output) => (output.to_text(), false),
        Err(e) => (tools::error_message(tool_name, &e), true),
    };

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [{ "type": "text", "text": text }],
            "isError": is_error
        }
    })
}

// ── resources/list ──────────────────────────────────────────────────────────

fn handle_resources_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "resources": [
                {
                    "uri": RESOURCE_AUTH_STATUS,
                    "name": "Authentication status",
                    "description": "Whether a CRM token is cached and how long it remains valid",
                    "mimeType": "application/json"
                },
                {
                    "uri": RESOURCE_EMPREENDIMENTOS,
                    "name": "Developments",
                    "description": "All active developments (empreendimentos)",
                    "mimeType": "application/json"
                },
                {
                    "uri": RESOURCE_CONFIG,
                    "name": "Configuration",
                    "description": "Server name, version and CRM tenant",
                    "mimeType": "application/json"
                }
            ]
        }
    })
}

// ── resources/read ──────────────────────────────────────────────────────────

async fn handle_resources_read(state: &AppState, request: &Value, id: &Value) -> Value {
    let uri = request
        .pointer("/params/uri")
        .and_then(|u| u.as_str())
        .unwrap_or("");

    let start = Instant::now();
    let content: CrmResult<Value> = match uri {
        RESOURCE_AUTH_STATUS => state.auth.status().await.map(|s| json!(s)),
        RESOURCE_EMPREENDIMENTOS => state.client.listar_empreendimentos().await.map(|e| json!(e)),
        RESOURCE_CONFIG => Ok(json!({
            "name": APP_NAME,
            "version": APP_VERSION,
            "dominio": state.domain(),
        })),
        _ => {
            return json_rpc_error(
                id.clone(),
                -32602,
                &format!("Unknown resource URI: {}", uri),
            );
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let (mime_type, text) = match content {
        Ok(value) => {
            tracing::info!(uri = %uri, duration_ms, "resource read");
            (
                "application/json",
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
            )
        }
        Err(e) => {
            tracing::warn!(uri = %uri, kind = e.kind(), duration_ms, "resource read failed: {}", e);
            ("text/plain", format!("Error reading resource: {}", e))
        }
    };

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "contents": [{
                "uri": uri,
                "mimeType": mime_type,
                "text": text
            }]
        }
    })
}

// ── JSON-RPC error helper ───────────────────────────────────────────────────

pub(crate) fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
