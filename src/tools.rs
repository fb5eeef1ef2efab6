//! Tool layer: the CRM operations exposed to MCP clients and the HTTP mirror.
//!
//! Each tool is a name, a description, a JSON Schema for its arguments and a
//! handler. Handlers deserialize and validate arguments locally (violations
//! are `CrmError::Validation`, raised before any network call), call the
//! request pipeline, and format the result:
//!
//! - `cvcrm_*`: back-office tools, answered as markdown
//! - `luna_*`: customer-assistant tools, answered as JSON documents

pub mod atendimentos;
pub mod clientes;
pub mod format;
pub mod luna;
pub mod reservas;
pub mod validation;

use std::time::Instant;

use serde_json::{Value, json};

use crate::crm::CrmClient;
use crate::error::{CrmError, CrmResult};

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Markdown for chat clients.
    Text(String),
    /// Structured result for automation clients.
    Json(Value),
}

impl ToolOutput {
    /// Text form for MCP `content` blocks.
    pub fn to_text(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ToolOutput::Text(text) => Value::String(text),
            ToolOutput::Json(value) => value,
        }
    }
}

/// MCP `Tool` object.
pub(crate) fn tool(name: &str, description: &str, input_schema: Value) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": input_schema,
    })
}

/// Every tool, in `tools/list` order.
pub fn definitions() -> Vec<Value> {
    let mut all = atendimentos::definitions();
    all.extend(clientes::definitions());
    all.extend(reservas::definitions());
    all.extend(luna::definitions());
    all
}

pub fn is_known_tool(name: &str) -> bool {
    definitions()
        .iter()
        .any(|d| d.get("name").and_then(Value::as_str) == Some(name))
}

/// Message shown to MCP users when a tool fails.
pub fn error_message(name: &str, err: &CrmError) -> String {
    format!("❌ **Error executing {}**\n\n{}", name, err)
}

/// Central dispatcher.
pub async fn execute_tool(client: &CrmClient, name: &str, args: Value) -> CrmResult<ToolOutput> {
    let start = Instant::now();
    tracing::info!(tool = %name, "tool call");

    let result = match name {
        "cvcrm_criar_atendimento" => atendimentos::criar_atendimento(client, args).await,
        "cvcrm_listar_atendimentos" => atendimentos::listar_atendimentos(client, args).await,
        "cvcrm_cadastrar_cliente" => clientes::cadastrar_cliente(client, args).await,
        "cvcrm_buscar_clientes" => clientes::buscar_clientes(client, args).await,
        "cvcrm_criar_reserva" => reservas::criar_reserva(client, args).await,
        "cvcrm_listar_reservas" => reservas::listar_reservas(client, args).await,
        "cvcrm_informar_venda" => reservas::informar_venda(client, args).await,
        "luna_identificar_cliente" => luna::identificar_cliente(client, args).await,
        "luna_consultar_parcelas" => luna::consultar_parcelas(client, args).await,
        "luna_gerar_segunda_via_boleto" => luna::gerar_segunda_via_boleto(client, args).await,
        "luna_criar_chamado_assistencia" => luna::criar_chamado_assistencia(client, args).await,
        "luna_consultar_chamados" => luna::consultar_chamados(client, args).await,
        "luna_listar_empreendimentos_disponiveis" => {
            luna::listar_empreendimentos_disponiveis(client, args).await
        }
        _ => Err(CrmError::not_found("Tool", name)),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::info!(tool = %name, duration_ms, "tool call succeeded"),
        Err(e) => tracing::warn!(tool = %name, kind = e.kind(), duration_ms, "tool call failed: {}", e),
    }
    result
}
