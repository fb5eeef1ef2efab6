// Relationship desk tickets (atendimentos).

use serde::Deserialize;
use serde_json::{Value, json};

use super::format::{opt_date_br, opt_datetime_br};
use super::validation::{Violations, parse_args};
use super::{ToolOutput, tool};
use crate::crm::CrmClient;
use crate::crm::types::{CriarAtendimentoInput, FiltrosAtendimento};
use crate::error::CrmResult;

const PRIORIDADES: &[&str] = &["baixa", "media", "alta"];

pub fn definitions() -> Vec<Value> {
    vec![
        tool(
            "cvcrm_criar_atendimento",
            "Create a new relationship ticket (atendimento) in CV CRM.",
            json!({
                "type": "object",
                "properties": {
                    "assunto": { "type": "string", "description": "Ticket subject (min 5 characters)" },
                    "descricao": { "type": "string", "description": "Detailed description (min 10 characters)" },
                    "clienteId": { "type": "number", "description": "Client ID" },
                    "prioridade": { "type": "string", "enum": PRIORIDADES, "description": "Priority" },
                    "tipoAtendimentoId": { "type": "number", "description": "Ticket type ID" }
                },
                "required": ["assunto", "descricao", "clienteId"]
            }),
        ),
        tool(
            "cvcrm_listar_atendimentos",
            "List relationship tickets with optional filters.",
            json!({
                "type": "object",
                "properties": {
                    "clienteId": { "type": "number", "description": "Filter by client ID" },
                    "situacao": { "type": "string", "description": "Filter by status" },
                    "dataInicio": { "type": "string", "description": "Start date (YYYY-MM-DD)" },
                    "dataFim": { "type": "string", "description": "End date (YYYY-MM-DD)" },
                    "page": { "type": "number", "description": "Page number (default 1)" },
                    "limit": { "type": "number", "description": "Items per page (default 20, max 100)" }
                },
                "required": []
            }),
        ),
    ]
}

pub async fn criar_atendimento(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let input: CriarAtendimentoInput = parse_args(args)?;
    Violations::new()
        .min_len("assunto", &input.assunto, 5)
        .min_len("descricao", &input.descricao, 10)
        .positive("clienteId", input.cliente_id)
        .one_of("prioridade", input.prioridade.as_deref(), PRIORIDADES)
        .positive_opt("tipoAtendimentoId", input.tipo_atendimento_id)
        .finish()?;

    let atendimento = client.criar_atendimento(&input).await?;

    Ok(ToolOutput::Text(format!(
        "✅ **Ticket created**\n\n\
         📋 **Details:**\n\
         - **Protocol:** {}\n\
         - **ID:** {}\n\
         - **Status:** {}\n\
         - **Subject:** {}\n\
         - **Date:** {}\n\n\
         💡 The ticket is registered and can now be followed up.",
        atendimento.protocolo,
        atendimento.id,
        atendimento.situacao,
        atendimento.assunto,
        opt_datetime_br(atendimento.data_criacao.as_deref()),
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListarArgs {
    cliente_id: Option<u64>,
    situacao: Option<String>,
    data_inicio: Option<String>,
    data_fim: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

pub async fn listar_atendimentos(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: ListarArgs = parse_args(args)?;
    Violations::new()
        .positive_opt("clienteId", args.cliente_id)
        .date_opt("dataInicio", args.data_inicio.as_deref())
        .date_opt("dataFim", args.data_fim.as_deref())
        .paging(args.page, args.limit)
        .finish()?;

    let filtros = FiltrosAtendimento {
        cliente_id: args.cliente_id,
        situacao: args.situacao,
        data_inicio: args.data_inicio,
        data_fim: args.data_fim,
        page: args.page,
        limit: args.limit,
    };
    let page = client.listar_atendimentos(&filtros).await?;

    if page.data.is_empty() {
        return Ok(ToolOutput::Text(
            "📋 **No tickets found** for the given filters.".to_string(),
        ));
    }

    let items: Vec<String> = page
        .data
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let cliente = a
                .cliente_nome
                .clone()
                .or_else(|| a.cliente_id.map(|id| format!("ID {}", id)))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}. **{}** - {}\n   - Client: {}\n   - Status: {}\n   - Priority: {}\n   - Date: {}",
                i + 1,
                a.protocolo,
                a.assunto,
                cliente,
                a.situacao,
                a.prioridade.as_deref().unwrap_or("-"),
                opt_date_br(a.data_criacao.as_deref()),
            )
        })
        .collect();

    Ok(ToolOutput::Text(format!(
        "📋 **Tickets found** ({} total, page {}/{})\n\n{}\n\n💡 Use cvcrm_criar_atendimento to open a new ticket.",
        page.total,
        page.page,
        page.total_pages,
        items.join("\n\n"),
    )))
}
