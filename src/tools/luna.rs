//! Customer-assistant tools ("Luna"). Every tool answers with a JSON document
//! so automation platforms can consume it through the HTTP mirror as well.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::validation::{Violations, parse_args};
use super::{ToolOutput, tool};
use crate::crm::CrmClient;
use crate::crm::types::{
    CriarAssistenciaInput, Empreendimento, FiltrosAssistencia, FiltrosCliente, FiltrosReserva,
    GerarBoletoInput, Parcela,
};
use crate::error::CrmResult;

const URGENCIAS: &[&str] = &["baixa", "media", "alta"];
const SITUACOES_PARCELA: &[&str] = &["todas", "em_aberto", "vencidas", "pagas"];

/// Kebab-case aliases served under `POST /api/luna/{alias}`.
pub const ALIASES: &[(&str, &str)] = &[
    ("identificar-cliente", "luna_identificar_cliente"),
    ("consultar-parcelas", "luna_consultar_parcelas"),
    ("gerar-boleto", "luna_gerar_segunda_via_boleto"),
    ("criar-chamado", "luna_criar_chamado_assistencia"),
    ("consultar-chamados", "luna_consultar_chamados"),
    ("listar-empreendimentos", "luna_listar_empreendimentos_disponiveis"),
];

pub fn definitions() -> Vec<Value> {
    vec![
        tool(
            "luna_identificar_cliente",
            "Identify a client by CPF and return their data plus linked units with segment (VIP/economy).",
            json!({
                "type": "object",
                "properties": {
                    "cpf": { "type": "string", "description": "Client CPF (11 digits, no mask)" },
                    "nome": { "type": "string", "description": "Client name (optional, used as a cross-check)" }
                },
                "required": ["cpf"]
            }),
        ),
        tool(
            "luna_consultar_parcelas",
            "List a client's instalments for a unit, with paid/open/overdue totals.",
            json!({
                "type": "object",
                "properties": {
                    "clienteId": { "type": "number", "description": "Client ID" },
                    "unidadeId": { "type": "number", "description": "Unit ID" },
                    "situacao": { "type": "string", "enum": SITUACOES_PARCELA, "description": "Filter by status" }
                },
                "required": ["clienteId", "unidadeId"]
            }),
        ),
        tool(
            "luna_gerar_segunda_via_boleto",
            "Issue an updated copy of an instalment's bank slip (boleto).",
            json!({
                "type": "object",
                "properties": {
                    "parcelaId": { "type": "number", "description": "Instalment ID" },
                    "enviarEmail": { "type": "boolean", "description": "Also send it by e-mail" }
                },
                "required": ["parcelaId"]
            }),
        ),
        tool(
            "luna_criar_chamado_assistencia",
            "Open a technical assistance ticket for a unit.",
            json!({
                "type": "object",
                "properties": {
                    "clienteId": { "type": "number", "description": "Client ID" },
                    "unidadeId": { "type": "number", "description": "Unit ID" },
                    "descricaoProblema": { "type": "string", "description": "Detailed problem description (min 10 characters)" },
                    "localidade": { "type": "string", "description": "Location ID of the problem (kitchen, bathroom, ...)" },
                    "urgencia": { "type": "string", "enum": URGENCIAS, "description": "Urgency" },
                    "fotosBase64": { "type": "array", "items": { "type": "string" }, "description": "Photos as base64 (optional)" }
                },
                "required": ["clienteId", "unidadeId", "descricaoProblema"]
            }),
        ),
        tool(
            "luna_consultar_chamados",
            "List a client's technical assistance tickets.",
            json!({
                "type": "object",
                "properties": {
                    "clienteId": { "type": "number", "description": "Client ID" },
                    "unidadeId": { "type": "number", "description": "Unit ID (optional)" },
                    "situacao": { "type": "string", "description": "Filter by status" }
                },
                "required": ["clienteId"]
            }),
        ),
        tool(
            "luna_listar_empreendimentos_disponiveis",
            "List developments with units available for sale.",
            json!({
                "type": "object",
                "properties": {
                    "cidade": { "type": "string", "description": "Filter by city" },
                    "bairro": { "type": "string", "description": "Filter by neighbourhood" },
                    "tipoImovel": { "type": "string", "description": "Property type (apartamento, casa, comercial)" },
                    "valorMin": { "type": "number", "description": "Minimum price" },
                    "valorMax": { "type": "number", "description": "Maximum price" }
                },
                "required": []
            }),
        ),
    ]
}

pub fn tool_for_alias(alias: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(a, _)| *a == alias)
        .map(|(_, name)| *name)
}

pub fn is_luna_tool(name: &str) -> bool {
    ALIASES.iter().any(|(_, n)| *n == name)
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

// ── Identification ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IdentificarArgs {
    cpf: String,
    nome: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnidadeCliente {
    id: u64,
    numero_unidade: String,
    situacao: String,
    segmento: &'static str,
}

// TODO: derive the segment from the development once a per-client units
// endpoint is available; reservations do not carry it.
const DEFAULT_SEGMENT: &str = "economico";

pub async fn identificar_cliente(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: IdentificarArgs = parse_args(args)?;
    Violations::new()
        .cpf_opt("cpf", Some(args.cpf.as_str()))
        .finish()?;

    let found = client
        .buscar_clientes(&FiltrosCliente {
            cpf: Some(args.cpf.clone()),
            limit: Some(1),
            ..Default::default()
        })
        .await?;

    let Some(cliente) = found.data.into_iter().next() else {
        return Ok(ToolOutput::Json(json!({
            "encontrado": false,
            "mensagem": "No client found with this CPF",
        })));
    };

    if let Some(nome) = args.nome.as_deref().filter(|n| !n.is_empty()) {
        if !contains_ci(Some(cliente.nome.as_str()), nome) {
            return Ok(ToolOutput::Json(json!({
                "encontrado": false,
                "mensagem": "CPF found but the name does not match",
            })));
        }
    }

    let reservas = client
        .listar_reservas(&FiltrosReserva {
            cliente_id: Some(cliente.id),
            ..Default::default()
        })
        .await?;

    let unidades: Vec<UnidadeCliente> = reservas
        .data
        .iter()
        .map(|r| UnidadeCliente {
            id: r.unidade_id,
            numero_unidade: format!("Unit {}", r.unidade_id),
            situacao: r.situacao.clone(),
            segmento: DEFAULT_SEGMENT,
        })
        .collect();
    let perfil = if unidades.iter().any(|u| u.segmento == "alto_padrao") {
        "vip"
    } else {
        "economico"
    };

    Ok(ToolOutput::Json(json!({
        "encontrado": true,
        "cliente": {
            "id": cliente.id,
            "nome": cliente.nome,
            "cpf": cliente.cpf,
            "email": cliente.email,
            "telefone": cliente.telefone.or(cliente.celular),
        },
        "unidades": unidades,
        "perfil": perfil,
    })))
}

// ── Financial ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParcelasArgs {
    cliente_id: u64,
    unidade_id: u64,
    situacao: Option<String>,
}

fn total_with_status(parcelas: &[Parcela], situacao: &str) -> f64 {
    parcelas
        .iter()
        .filter(|p| p.situacao == situacao)
        .map(|p| p.valor)
        .sum()
}

pub async fn consultar_parcelas(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: ParcelasArgs = parse_args(args)?;
    Violations::new()
        .positive("clienteId", args.cliente_id)
        .positive("unidadeId", args.unidade_id)
        .one_of("situacao", args.situacao.as_deref(), SITUACOES_PARCELA)
        .finish()?;

    let reservas = client
        .listar_reservas(&FiltrosReserva {
            cliente_id: Some(args.cliente_id),
            unidade_id: Some(args.unidade_id),
            limit: Some(1),
            ..Default::default()
        })
        .await?;
    let Some(reserva) = reservas.data.first() else {
        return Ok(ToolOutput::Json(json!({
            "erro": "No reservation found for this client and unit",
        })));
    };

    let parcelas = client.listar_parcelas(reserva.id).await?;

    let wanted = match args.situacao.as_deref() {
        Some("em_aberto") => Some("em_aberto"),
        Some("vencidas") => Some("vencida"),
        Some("pagas") => Some("paga"),
        _ => None,
    };
    let filtradas: Vec<&Parcela> = parcelas
        .iter()
        .filter(|p| wanted.is_none_or(|s| p.situacao == s))
        .collect();

    Ok(ToolOutput::Json(json!({
        "parcelas": filtradas,
        "resumo": {
            "totalPago": total_with_status(&parcelas, "paga"),
            "totalEmAberto": total_with_status(&parcelas, "em_aberto"),
            "totalVencido": total_with_status(&parcelas, "vencida"),
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoletoArgs {
    parcela_id: u64,
    enviar_email: Option<bool>,
}

pub async fn gerar_segunda_via_boleto(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: BoletoArgs = parse_args(args)?;
    Violations::new()
        .positive("parcelaId", args.parcela_id)
        .finish()?;

    let boleto = client
        .gerar_segunda_via_boleto(&GerarBoletoInput {
            parcela_id: args.parcela_id,
            enviar_email: args.enviar_email.unwrap_or(false),
        })
        .await?;

    Ok(ToolOutput::Json(json!({
        "linkBoleto": boleto.link_boleto,
        "valor": boleto.valor,
        "dataVencimento": boleto.data_vencimento,
        "codigoBarras": boleto.codigo_barras,
        "emailEnviado": boleto.email_enviado.unwrap_or(false),
    })))
}

// ── Technical assistance ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CriarChamadoArgs {
    cliente_id: u64,
    unidade_id: u64,
    descricao_problema: String,
    localidade: Option<String>,
    urgencia: Option<String>,
    #[serde(default)]
    fotos_base64: Vec<String>,
}

/// Leading digits of `value`, the way a location code is typed by hand
/// (`"12 - cozinha"` → 12).
fn parse_location_id(value: &str) -> Option<u64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

pub async fn criar_chamado_assistencia(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: CriarChamadoArgs = parse_args(args)?;
    Violations::new()
        .positive("clienteId", args.cliente_id)
        .positive("unidadeId", args.unidade_id)
        .min_len("descricaoProblema", &args.descricao_problema, 10)
        .one_of("urgencia", args.urgencia.as_deref(), URGENCIAS)
        .finish()?;

    let assistencia = client
        .criar_assistencia(&CriarAssistenciaInput {
            unidade_id: args.unidade_id,
            descricao: args.descricao_problema,
            localidade_id: args.localidade.as_deref().and_then(parse_location_id),
            prioridade: args.urgencia.unwrap_or_else(|| "media".to_string()),
        })
        .await?;

    for foto in &args.fotos_base64 {
        client
            .upload_assistencia_foto(assistencia.id, foto)
            .await?;
    }

    Ok(ToolOutput::Json(json!({
        "chamadoId": assistencia.id,
        "protocolo": assistencia.protocolo,
        "situacao": assistencia.situacao,
        "dataCriacao": assistencia.data_criacao,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsultarChamadosArgs {
    cliente_id: u64,
    unidade_id: Option<u64>,
    situacao: Option<String>,
}

pub async fn consultar_chamados(client: &CrmClient, args: Value) -> CrmResult<ToolOutput> {
    let args: ConsultarChamadosArgs = parse_args(args)?;
    Violations::new()
        .positive("clienteId", args.cliente_id)
        .positive_opt("unidadeId", args.unidade_id)
        .finish()?;

    let page = client
        .listar_assistencias(&FiltrosAssistencia {
            unidade_id: args.unidade_id,
            situacao: args.situacao.filter(|s| !s.is_empty()),
            ..Default::default()
        })
        .await?;

    let chamados: Vec<Value> = page
        .data
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "protocolo": a.protocolo,
                "descricao": a.descricao,
                "situacao": a.situacao,
                "dataCriacao": a.data_criacao,
                "dataAtualizacao": a.data_atualizacao,
            })
        })
        .collect();

    Ok(ToolOutput::Json(json!({
        "total": chamados.len(),
        "chamados": chamados,
    })))
}

// ── Sales ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmpreendimentosArgs {
    cidade: Option<String>,
    bairro: Option<String>,
    /// Accepted for compatibility; developments carry no property type.
    #[allow(dead_code)]
    tipo_imovel: Option<String>,
    valor_min: Option<f64>,
    valor_max: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EmpreendimentoDisponivel {
    id: u64,
    nome: String,
    codigo: Option<String>,
    situacao: Option<String>,
    cidade: String,
    estado: String,
    unidades_disponiveis: usize,
    valor_minimo: f64,
    valor_maximo: f64,
}

impl EmpreendimentoDisponivel {
    fn from_empreendimento(emp: &Empreendimento) -> Self {
        let endereco = emp.endereco.clone().unwrap_or_default();
        Self {
            id: emp.id,
            nome: emp.nome.clone(),
            codigo: emp.codigo.clone(),
            situacao: emp.situacao.clone(),
            cidade: endereco.cidade.unwrap_or_default(),
            estado: endereco.estado.unwrap_or_default(),
            unidades_disponiveis: 0,
            valor_minimo: 0.0,
            valor_maximo: 0.0,
        }
    }
}

/// Fetch available units for one development and apply the price window.
/// A failed unit lookup keeps the development with zeroed figures.
async fn with_unit_figures(
    client: &CrmClient,
    emp: &Empreendimento,
    valor_min: Option<f64>,
    valor_max: Option<f64>,
) -> Option<EmpreendimentoDisponivel> {
    let mut item = EmpreendimentoDisponivel::from_empreendimento(emp);
    let unidades = match client.listar_unidades_disponiveis(emp.id).await {
        Ok(unidades) => unidades,
        Err(e) => {
            tracing::warn!(empreendimento_id = emp.id, "unit lookup failed: {}", e);
            return Some(item);
        }
    };

    let valores: Vec<f64> = unidades
        .iter()
        .filter_map(|u| u.valor_venda)
        .filter(|v| *v > 0.0)
        .collect();
    let minimo = valores.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let maximo = valores.iter().copied().reduce(f64::max).unwrap_or(0.0);

    if valor_min.is_some_and(|min| min > 0.0 && maximo < min) {
        return None;
    }
    if valor_max.is_some_and(|max| max > 0.0 && minimo > max) {
        return None;
    }

    item.unidades_disponiveis = unidades.len();
    item.valor_minimo = minimo;
    item.valor_maximo = maximo;
    Some(item)
}

pub async fn listar_empreendimentos_disponiveis(
    client: &CrmClient,
    args: Value,
) -> CrmResult<ToolOutput> {
    let args: EmpreendimentosArgs = parse_args(args)?;
    let mut rules = Violations::new();
    rules.check(
        args.valor_min.is_none_or(|v| v >= 0.0),
        "valorMin must not be negative",
    );
    rules.check(
        args.valor_max.is_none_or(|v| v >= 0.0),
        "valorMax must not be negative",
    );
    rules.finish()?;

    let empreendimentos = client.listar_empreendimentos().await?;
    let selecionados: Vec<&Empreendimento> = empreendimentos
        .iter()
        .filter(|emp| match args.cidade.as_deref().filter(|c| !c.is_empty()) {
            Some(cidade) => contains_ci(
                emp.endereco.as_ref().and_then(|e| e.cidade.as_deref()),
                cidade,
            ),
            None => true,
        })
        .filter(|emp| match args.bairro.as_deref().filter(|b| !b.is_empty()) {
            Some(bairro) => contains_ci(
                emp.endereco.as_ref().and_then(|e| e.bairro.as_deref()),
                bairro,
            ),
            None => true,
        })
        .collect();

    let resultado: Vec<EmpreendimentoDisponivel> = join_all(
        selecionados
            .into_iter()
            .map(|emp| with_unit_figures(client, emp, args.valor_min, args.valor_max)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    Ok(ToolOutput::Json(json!({
        "total": resultado.len(),
        "empreendimentos": resultado,
    })))
}
