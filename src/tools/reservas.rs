// Unit reservations and sales (reservas).

use serde::Deserialize;
use serde_json::{Value, json};

use super::format::{brl, date_br, opt_date_br};
use super::validation::{Violations, parse_args};
use super::{ToolOutput, tool};
use crate::crm::CrmClient;
use crate::crm::types::{CriarReservaInput, FiltrosReserva, InformarVendaInput};
use crate::error::CrmResult;

pub fn definitions() -> Vec<Value> {
    vec![
        tool(
            "cvcrm_criar_reserva",
            "Reserve a unit for one or more buyers in CV CRM.",
            json!({
                "type": "object",
                "properties": {
                    "unidadeId": { "type": "number", "description": "Unit ID" },
                    "clienteIds": { "type": "array", "items": { "type": "number" }, "description": "Buyer client IDs" },
                    "tabelaPrecoId": { "type": "number", "description": "Price table ID" },
                    "corretorId": { "type": "number", "description": "Broker ID" },
                    "imobiliariaId": { "type": "number", "description": "Real-estate agency ID" },
                    "dataReserva": { "type": "string", "description": "Reservation date (ISO 8601: YYYY-MM-DD or YYYY-MM-DDTHH:mm:ss)" },
                    "observacoes": { "type": "string", "description": "Notes" }
                },
                "required": ["unidadeId", "clienteIds", "tabelaPrecoId", "dataReserva"]
            }),
        ),
        tool(
            "cvcrm_listar_reservas",
            "List reservations with optional filters.",
            json!({
                "type": "object",
                "properties": {
                    "empreendimentoId": { "type": "number", "description": "Filter by development" },
                    "unidadeId": { "type": "number", "description": "Filter by unit" },
                    "clienteId": { "type": "number", "description": "Filter by client" },
                    "situacao": { "type": "string", "description": "Filter by status" },
                    "dataInicio": { "type": "string", "description": "Start date (YYYY-MM-DD)" },
                    "dataFim": { "type": "string", "description": "End date (YYYY-MM-DD)" },
                    "page": { "type": "number", "description": "Page number" },
                    "limit": { "type": "number", "description": "Items per page (max 100)" }
                },
                "required": []
            }),
        ),
        tool(
            "cvcrm_informar_venda",
            "Mark a reservation as sold.",
            json!({
                "type": "object",
                "properties": {
                    "reservaId": { "type": "number", "description": "Reservation ID" },
                    "dataVenda": { "type": "string", "description": "Sale date (ISO 8601)" },
                    "observacoes": { "type": "string", "description": "Notes" }
                },
                "required": ["reservaId", "dataVenda"]
            }),
        ),
    ]
}

pub async fn criar_reserva(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let input: CriarReservaInput = parse_args(args)?;
    let mut rules = Violations::new();
    rules
        .positive("unidadeId", input.unidade_id)
        .check(!input.cliente_ids.is_empty(), "clienteIds must contain at least one client")
        .check(
            input.cliente_ids.iter().all(|id| *id > 0),
            "clienteIds must contain positive numbers",
        )
        .positive("tabelaPrecoId", input.tabela_preco_id)
        .positive_opt("corretorId", input.corretor_id)
        .positive_opt("imobiliariaId", input.imobiliaria_id)
        .date("dataReserva", &input.data_reserva);
    rules.finish()?;

    let reserva = client.criar_reserva(&input).await?;

    Ok(ToolOutput::Text(format!(
        "✅ **Reservation created**\n\n\
         📋 **Reservation details:**\n\
         - **Number:** {}\n\
         - **ID:** {}\n\
         - **Status:** {}\n\
         - **Unit:** ID {}\n\
         - **Total value:** {}\n\
         - **Reservation date:** {}\n\
         - **Clients:** {} client(s)\n\n\
         💡 **Next steps:**\n\
         - Send documents for signature\n\
         - Process payments\n\
         - Follow the reservation workflow",
        reserva.numero,
        reserva.id,
        reserva.situacao,
        reserva.unidade_id,
        brl(reserva.valor_total),
        opt_date_br(reserva.data_reserva.as_deref()),
        reserva.cliente_ids.len(),
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListarArgs {
    empreendimento_id: Option<u64>,
    unidade_id: Option<u64>,
    cliente_id: Option<u64>,
    situacao: Option<String>,
    data_inicio: Option<String>,
    data_fim: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

pub async fn listar_reservas(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: ListarArgs = parse_args(args)?;
    Violations::new()
        .positive_opt("empreendimentoId", args.empreendimento_id)
        .positive_opt("unidadeId", args.unidade_id)
        .positive_opt("clienteId", args.cliente_id)
        .date_opt("dataInicio", args.data_inicio.as_deref())
        .date_opt("dataFim", args.data_fim.as_deref())
        .paging(args.page, args.limit)
        .finish()?;

    let filtros = FiltrosReserva {
        empreendimento_id: args.empreendimento_id,
        unidade_id: args.unidade_id,
        cliente_id: args.cliente_id,
        situacao: args.situacao,
        data_inicio: args.data_inicio,
        data_fim: args.data_fim,
        page: args.page,
        limit: args.limit,
    };
    let page = client.listar_reservas(&filtros).await?;

    if page.data.is_empty() {
        return Ok(ToolOutput::Text(
            "📋 **No reservations found** for the given filters.".to_string(),
        ));
    }

    let items: Vec<String> = page
        .data
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. **{}** - {}\n   - Unit: ID {}\n   - Value: {}\n   - Date: {}\n   - Clients: {}",
                i + 1,
                r.numero,
                r.situacao,
                r.unidade_id,
                brl(r.valor_total),
                opt_date_br(r.data_reserva.as_deref()),
                r.cliente_ids.len(),
            )
        })
        .collect();

    Ok(ToolOutput::Text(format!(
        "📋 **Reservations found** ({} total, page {}/{})\n\n{}\n\n💡 Use cvcrm_informar_venda to mark a reservation as sold.",
        page.total,
        page.page,
        page.total_pages,
        items.join("\n\n"),
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InformarVendaArgs {
    reserva_id: u64,
    data_venda: String,
    observacoes: Option<String>,
}

pub async fn informar_venda(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: InformarVendaArgs = parse_args(args)?;
    Violations::new()
        .positive("reservaId", args.reserva_id)
        .date("dataVenda", &args.data_venda)
        .finish()?;

    client
        .informar_venda(
            args.reserva_id,
            &InformarVendaInput {
                data_venda: args.data_venda.clone(),
                observacoes: args.observacoes.clone(),
            },
        )
        .await?;

    let mut text = format!(
        "✅ **Sale reported**\n\n📋 **Details:**\n- **Reservation ID:** {}\n- **Sale date:** {}\n",
        args.reserva_id,
        date_br(&args.data_venda),
    );
    if let Some(obs) = &args.observacoes {
        text.push_str(&format!("- **Notes:** {}\n", obs));
    }
    text.push_str("\n💡 The reservation is now marked as **sold**.");
    Ok(ToolOutput::Text(text))
}
