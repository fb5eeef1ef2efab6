// CV CRM wire types. Field names follow the upstream JSON (camelCase,
// Portuguese). Response types are lenient: optional fields default so a
// sparse upstream payload still parses.

use serde::{Deserialize, Serialize};

// ── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RequestCodeBody<'a> {
    pub email: &'a str,
    pub cpf: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeResponse {
    #[serde(default)]
    pub sucesso: bool,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub validade_minutos: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateTokenBody<'a> {
    pub email: &'a str,
    pub codigo: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expira_em: Option<serde_json::Value>,
}

// ── Shared ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u64,
    #[serde(default = "first_page")]
    pub total_pages: u64,
}

fn first_page() -> u64 {
    1
}

/// `{ "data": [...] }` envelope used by the registry endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// List endpoints answer either a bare array or a `{ "data": [...] }`
/// envelope depending on the resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Bare(Vec<T>),
    Wrapped(DataEnvelope<T>),
}

impl<T> ListPayload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) => items,
            ListPayload::Wrapped(envelope) => envelope.data,
        }
    }
}

// ── Atendimentos ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atendimento {
    pub id: u64,
    #[serde(default)]
    pub protocolo: String,
    #[serde(default)]
    pub assunto: String,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub cliente_id: Option<u64>,
    #[serde(default)]
    pub cliente_nome: Option<String>,
    #[serde(default)]
    pub situacao: String,
    #[serde(default)]
    pub prioridade: Option<String>,
    #[serde(default)]
    pub data_criacao: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriarAtendimentoInput {
    pub assunto: String,
    pub descricao: String,
    pub cliente_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioridade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_atendimento_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosAtendimento {
    pub cliente_id: Option<u64>,
    pub situacao: Option<String>,
    pub data_inicio: Option<String>,
    pub data_fim: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdicionarMensagemInput {
    pub mensagem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privada: Option<bool>,
}

// ── Assistência técnica ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistencia {
    pub id: u64,
    #[serde(default)]
    pub protocolo: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default)]
    pub situacao: String,
    #[serde(default)]
    pub unidade_id: Option<u64>,
    #[serde(default)]
    pub data_criacao: Option<String>,
    #[serde(default)]
    pub data_atualizacao: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriarAssistenciaInput {
    pub unidade_id: u64,
    pub descricao: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localidade_id: Option<u64>,
    pub prioridade: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosAssistencia {
    pub unidade_id: Option<u64>,
    pub situacao: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdicionarVisitaInput {
    pub data_visita: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

// ── Clientes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cliente {
    pub id: u64,
    #[serde(default)]
    pub codigo: Option<String>,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub tipo_pessoa: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub celular: Option<String>,
    #[serde(default)]
    pub data_cadastro: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadastrarClienteInput {
    pub tipo_pessoa: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razao_social: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celular: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosCliente {
    pub nome: Option<String>,
    pub cpf: Option<String>,
    pub cnpj: Option<String>,
    pub email: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// ── Reservas ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reserva {
    pub id: u64,
    #[serde(default)]
    pub numero: String,
    #[serde(default)]
    pub situacao: String,
    #[serde(default)]
    pub unidade_id: u64,
    #[serde(default)]
    pub cliente_ids: Vec<u64>,
    #[serde(default)]
    pub valor_total: f64,
    #[serde(default)]
    pub data_reserva: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriarReservaInput {
    pub unidade_id: u64,
    pub cliente_ids: Vec<u64>,
    pub tabela_preco_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corretor_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imobiliaria_id: Option<u64>,
    pub data_reserva: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosReserva {
    pub empreendimento_id: Option<u64>,
    pub unidade_id: Option<u64>,
    pub cliente_id: Option<u64>,
    pub situacao: Option<String>,
    pub data_inicio: Option<String>,
    pub data_fim: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InformarVendaInput {
    pub data_venda: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessarDistratoInput {
    pub data_distrato: String,
    pub motivo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

// ── Financeiro ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcela {
    pub id: u64,
    #[serde(default)]
    pub numero: u32,
    #[serde(default)]
    pub valor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_corrigido: Option<f64>,
    #[serde(default)]
    pub data_vencimento: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_pagamento: Option<String>,
    #[serde(default)]
    pub situacao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_boleto: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GerarBoletoInput {
    pub parcela_id: u64,
    pub enviar_email: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boleto {
    #[serde(default)]
    pub link_boleto: Option<String>,
    #[serde(default)]
    pub valor: Option<f64>,
    #[serde(default)]
    pub data_vencimento: Option<String>,
    #[serde(default)]
    pub codigo_barras: Option<String>,
    #[serde(default)]
    pub email_enviado: Option<bool>,
}

// ── Comissões ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comissao {
    pub id: u64,
    #[serde(default)]
    pub reserva_id: Option<u64>,
    #[serde(default)]
    pub corretor_id: Option<u64>,
    #[serde(default)]
    pub valor: f64,
    #[serde(default)]
    pub situacao: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosComissao {
    pub reserva_id: Option<u64>,
    pub corretor_id: Option<u64>,
    pub situacao: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterarSituacaoComissaoInput {
    pub situacao: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

// ── Cadastros gerais ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endereco {
    #[serde(default)]
    pub cidade: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Empreendimento {
    pub id: u64,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub codigo: Option<String>,
    #[serde(default)]
    pub situacao: Option<String>,
    #[serde(default)]
    pub endereco: Option<Endereco>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unidade {
    pub id: u64,
    #[serde(default)]
    pub valor_venda: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSituacao {
    pub id: u64,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub ordem: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub funcionalidade: Option<String>,
    #[serde(default)]
    pub situacoes: Vec<WorkflowSituacao>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estado {
    pub id: u64,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub sigla: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cidade {
    pub id: u64,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub estado_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginated_response_tolerates_missing_metadata() {
        let page: PaginatedResponse<Cliente> =
            serde_json::from_str(r#"{"data":[{"id":7,"nome":"Ana"}]}"#).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn inputs_serialize_camel_case_and_skip_absent_fields() {
        let input = CriarAtendimentoInput {
            assunto: "Vazamento".into(),
            descricao: "Vazamento na cozinha".into(),
            cliente_id: 9,
            prioridade: None,
            tipo_atendimento_id: Some(3),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["clienteId"], 9);
        assert_eq!(json["tipoAtendimentoId"], 3);
        assert!(json.get("prioridade").is_none());
    }

    #[test]
    fn list_payload_accepts_both_shapes() {
        let bare: ListPayload<Unidade> =
            serde_json::from_str(r#"[{"id":1,"valorVenda":250000.0}]"#).unwrap();
        let wrapped: ListPayload<Unidade> =
            serde_json::from_str(r#"{"data":[{"id":1},{"id":2}]}"#).unwrap();
        assert_eq!(bare.into_vec()[0].valor_venda, Some(250000.0));
        assert_eq!(wrapped.into_vec().len(), 2);
    }

    #[test]
    fn request_code_response_reads_validity_minutes() {
        let resp: RequestCodeResponse =
            serde_json::from_str(r#"{"sucesso":true,"validadeMinutos":10}"#).unwrap();
        assert!(resp.sucesso);
        assert_eq!(resp.validade_minutos, Some(10));
    }
}
