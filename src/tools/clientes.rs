// Client registry (clientes).

use serde::Deserialize;
use serde_json::{Value, json};

use super::format::opt_datetime_br;
use super::validation::{Violations, parse_args};
use super::{ToolOutput, tool};
use crate::crm::CrmClient;
use crate::crm::types::{CadastrarClienteInput, FiltrosCliente};
use crate::error::CrmResult;

const TIPOS_PESSOA: &[&str] = &["fisica", "juridica"];

pub fn definitions() -> Vec<Value> {
    vec![
        tool(
            "cvcrm_cadastrar_cliente",
            "Register a new client (individual or company) in CV CRM.",
            json!({
                "type": "object",
                "properties": {
                    "tipoPessoa": { "type": "string", "enum": TIPOS_PESSOA, "description": "Person type" },
                    "nome": { "type": "string", "description": "Full name (individuals)" },
                    "cpf": { "type": "string", "description": "CPF, 11 digits without punctuation (individuals)" },
                    "razaoSocial": { "type": "string", "description": "Company name (companies)" },
                    "cnpj": { "type": "string", "description": "CNPJ, 14 digits without punctuation (companies)" },
                    "email": { "type": "string", "description": "E-mail" },
                    "telefone": { "type": "string", "description": "Landline" },
                    "celular": { "type": "string", "description": "Mobile" }
                },
                "required": ["tipoPessoa", "email"]
            }),
        ),
        tool(
            "cvcrm_buscar_clientes",
            "Search clients by name, CPF, CNPJ or e-mail.",
            json!({
                "type": "object",
                "properties": {
                    "nome": { "type": "string", "description": "Name (partial match)" },
                    "cpf": { "type": "string", "description": "CPF" },
                    "cnpj": { "type": "string", "description": "CNPJ" },
                    "email": { "type": "string", "description": "E-mail" },
                    "page": { "type": "number", "description": "Page number" },
                    "limit": { "type": "number", "description": "Items per page (max 100)" }
                },
                "required": []
            }),
        ),
    ]
}

fn tipo_pessoa_label(tipo: Option<&str>) -> &'static str {
    match tipo {
        Some("fisica") => "Individual",
        Some("juridica") => "Company",
        _ => "-",
    }
}

pub async fn cadastrar_cliente(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let input: CadastrarClienteInput = parse_args(args)?;
    let mut rules = Violations::new();
    rules
        .one_of("tipoPessoa", Some(input.tipo_pessoa.as_str()), TIPOS_PESSOA)
        .min_len_opt("nome", input.nome.as_deref(), 3)
        .cpf_opt("cpf", input.cpf.as_deref())
        .min_len_opt("razaoSocial", input.razao_social.as_deref(), 3)
        .cnpj_opt("cnpj", input.cnpj.as_deref())
        .email("email", &input.email);
    match input.tipo_pessoa.as_str() {
        "fisica" => {
            rules
                .check(input.nome.is_some(), "nome is required for tipoPessoa fisica")
                .check(input.cpf.is_some(), "cpf is required for tipoPessoa fisica");
        }
        "juridica" => {
            rules
                .check(
                    input.razao_social.is_some(),
                    "razaoSocial is required for tipoPessoa juridica",
                )
                .check(input.cnpj.is_some(), "cnpj is required for tipoPessoa juridica");
        }
        _ => {}
    }
    rules.finish()?;

    let cliente = client.cadastrar_cliente(&input).await?;

    let documento = match input.tipo_pessoa.as_str() {
        "fisica" => input.cpf.as_ref().map(|c| format!("CPF: {}", c)),
        _ => input.cnpj.as_ref().map(|c| format!("CNPJ: {}", c)),
    };
    let mut lines = vec![
        "✅ **Client registered**".to_string(),
        String::new(),
        "📋 **Details:**".to_string(),
        format!("- **ID:** {}", cliente.id),
        format!("- **Code:** {}", cliente.codigo.as_deref().unwrap_or("-")),
        format!("- **Name:** {}", cliente.nome),
        format!("- **Type:** {}", tipo_pessoa_label(Some(input.tipo_pessoa.as_str()))),
    ];
    if let Some(doc) = documento {
        lines.push(format!("- **Document:** {}", doc));
    }
    lines.push(format!(
        "- **E-mail:** {}",
        cliente.email.as_deref().unwrap_or(&input.email)
    ));
    lines.push(format!(
        "- **Registered at:** {}",
        opt_datetime_br(cliente.data_cadastro.as_deref())
    ));
    lines.push(String::new());
    lines.push(
        "💡 The client can now be used in tickets, reservations and other modules.".to_string(),
    );
    Ok(ToolOutput::Text(lines.join("\n")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuscarArgs {
    nome: Option<String>,
    cpf: Option<String>,
    cnpj: Option<String>,
    email: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
}

pub async fn buscar_clientes(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: BuscarArgs = parse_args(args)?;
    Violations::new().paging(args.page, args.limit).finish()?;

    let filtros = FiltrosCliente {
        nome: args.nome,
        cpf: args.cpf,
        cnpj: args.cnpj,
        email: args.email,
        page: args.page,
        limit: args.limit,
    };
    let page = client.buscar_clientes(&filtros).await?;

    if page.data.is_empty() {
        return Ok(ToolOutput::Text(
            "🔍 **No clients found** for the given filters.".to_string(),
        ));
    }

    let items: Vec<String> = page
        .data
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. **{}** (code: {})\n   - ID: {}\n   - Type: {}\n   - Document: {}\n   - E-mail: {}\n   - Phone: {}",
                i + 1,
                c.nome,
                c.codigo.as_deref().unwrap_or("-"),
                c.id,
                tipo_pessoa_label(c.tipo_pessoa.as_deref()),
                c.cpf.as_deref().or(c.cnpj.as_deref()).unwrap_or("not provided"),
                c.email.as_deref().unwrap_or("-"),
                c.celular
                    .as_deref()
                    .or(c.telefone.as_deref())
                    .unwrap_or("not provided"),
            )
        })
        .collect();

    Ok(ToolOutput::Text(format!(
        "🔍 **Clients found** ({} total, page {}/{})\n\n{}\n\n💡 Use the client ID to open tickets or reservations.",
        page.total,
        page.page,
        page.total_pages,
        items.join("\n\n"),
    )))
}
