// CV CRM bridge - authenticated request pipeline
// One outbound call per `request`: bearer token from the auth manager, JSON
// content type, fixed timeout, single error classifier. A 401 renews the
// token once and surfaces as an error; the call itself is never replayed.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Method;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;

use super::auth::AuthManager;
use super::request_timeout;
use super::types::*;
use crate::cache::{CADASTRO_TTL_SECS, CacheKeys, GEO_TTL_SECS, KeyValueStore};
use crate::config::REQUEST_TIMEOUT_MS;
use crate::error::{CrmError, CrmResult};

pub struct CrmClient {
    auth: Arc<AuthManager>,
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeys,
    http: reqwest::Client,
    base_url: String,
}

impl CrmClient {
    pub fn new(
        auth: Arc<AuthManager>,
        store: Arc<dyn KeyValueStore>,
        keys: CacheKeys,
        http: reqwest::Client,
    ) -> Self {
        let base_url = auth.config().base_url.clone();
        Self {
            auth,
            store,
            keys,
            http,
            base_url,
        }
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    // ── Pipeline ────────────────────────────────────────────────────────────

    /// Authenticated call to `{base_url}{endpoint}`. Success bodies are parsed
    /// as `T`; an empty body parses as JSON `null`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
    ) -> CrmResult<T> {
        let token = self.auth.get_token().await?;
        let url = format!("{}{}", self.base_url, endpoint);
        let start = Instant::now();

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(request_timeout());
        if let Some(body) = &body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::error!(endpoint = %endpoint, "CV CRM call timed out after {} ms", REQUEST_TIMEOUT_MS);
                CrmError::external(
                    format!("request to {} timed out after {} ms", endpoint, REQUEST_TIMEOUT_MS),
                    None,
                )
            } else {
                tracing::error!(endpoint = %endpoint, "CV CRM call failed: {}", e);
                CrmError::external(format!("request to {} failed", endpoint), None)
            }
        })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| {
            tracing::error!(endpoint = %endpoint, "CV CRM body read failed: {}", e);
            CrmError::external(format!("request to {} failed", endpoint), None)
        })?;

        if !status.is_success() {
            return Err(self.handle_error(status.as_u16(), &bytes, endpoint).await);
        }

        tracing::debug!(
            method = %method,
            endpoint = %endpoint,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "CV CRM call"
        );

        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(raw).map_err(|e| {
            tracing::error!(endpoint = %endpoint, "unexpected CV CRM payload: {}", e);
            CrmError::external(
                format!("unexpected response from {}", endpoint),
                Some(status.as_u16()),
            )
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> CrmResult<T> {
        self.request(endpoint, Method::GET, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> CrmResult<T> {
        let body = serde_json::to_value(body)
            .map_err(|e| CrmError::Validation(format!("cannot encode request body: {}", e)))?;
        self.request(endpoint, Method::POST, Some(body)).await
    }

    /// Classify a non-2xx response. 401 renews the token exactly once before
    /// reporting.
    async fn handle_error(&self, status: u16, body: &[u8], endpoint: &str) -> CrmError {
        let message =
            extract_message(body).unwrap_or_else(|| format!("API error {}", status));
        tracing::error!(status, endpoint = %endpoint, message = %message, "CV CRM call rejected");

        match status {
            401 => match self.auth.refresh_token().await {
                Ok(_) => CrmError::external("token expired and was renewed, try again", Some(401)),
                Err(e) => e,
            },
            404 => CrmError::not_found("Resource", endpoint),
            422 => CrmError::Validation(format!("invalid data: {}", message)),
            429 => CrmError::RateLimit(message),
            _ => CrmError::external(message, Some(status)),
        }
    }

    /// Read-through cache for slow-changing registry data.
    async fn cached<T, F>(&self, key: &str, ttl_secs: u64, fetch: F) -> CrmResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = CrmResult<T>>,
    {
        if let Some(raw) = self.store.get(key).await? {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!(key = %key, "registry cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(key = %key, "discarding unreadable cache entry: {}", e),
            }
        }

        let value = fetch.await?;
        match serde_json::to_string(&value) {
            Ok(raw) => self.store.set_ex(key, &raw, ttl_secs).await?,
            Err(e) => tracing::warn!(key = %key, "registry value not cacheable: {}", e),
        }
        Ok(value)
    }

    // ── Atendimentos ────────────────────────────────────────────────────────

    pub async fn criar_atendimento(&self, input: &CriarAtendimentoInput) -> CrmResult<Atendimento> {
        let result: Atendimento = self
            .post("/relacionamento/atendimentos/cadastrar", input)
            .await?;
        tracing::info!(id = result.id, "atendimento created");
        Ok(result)
    }

    pub async fn listar_atendimentos(
        &self,
        filtros: &FiltrosAtendimento,
    ) -> CrmResult<PaginatedResponse<Atendimento>> {
        let result: PaginatedResponse<Atendimento> = self
            .get(&with_query("/relacionamento/atendimentos", filtros))
            .await?;
        tracing::info!(total = result.total, "atendimentos listed");
        Ok(result)
    }

    pub async fn adicionar_mensagem_atendimento(
        &self,
        id: u64,
        input: &AdicionarMensagemInput,
    ) -> CrmResult<()> {
        let _: IgnoredAny = self
            .post(&format!("/relacionamento/atendimentos/{}/mensagem", id), input)
            .await?;
        tracing::info!(id, "message added to atendimento");
        Ok(())
    }

    // ── Assistência técnica ─────────────────────────────────────────────────

    pub async fn criar_assistencia(&self, input: &CriarAssistenciaInput) -> CrmResult<Assistencia> {
        let result: Assistencia = self.post("/assistenciatecnica/assistencia", input).await?;
        tracing::info!(id = result.id, "assistencia created");
        Ok(result)
    }

    pub async fn listar_assistencias(
        &self,
        filtros: &FiltrosAssistencia,
    ) -> CrmResult<PaginatedResponse<Assistencia>> {
        let result: PaginatedResponse<Assistencia> = self
            .get(&with_query("/assistenciatecnica/assistencias", filtros))
            .await?;
        tracing::info!(total = result.total, "assistencias listed");
        Ok(result)
    }

    pub async fn adicionar_visita(&self, id: u64, input: &AdicionarVisitaInput) -> CrmResult<()> {
        let _: IgnoredAny = self
            .post(&format!("/assistenciatecnica/assistencia/{}/visita", id), input)
            .await?;
        tracing::info!(assistencia_id = id, "visit scheduled");
        Ok(())
    }

    /// `arquivo` is the base64 payload.
    pub async fn upload_assistencia_foto(&self, id: u64, arquivo: &str) -> CrmResult<()> {
        let _: IgnoredAny = self
            .post(
                &format!("/assistenciatecnica/assistencia/{}/upload", id),
                &serde_json::json!({ "arquivo": arquivo }),
            )
            .await?;
        tracing::info!(assistencia_id = id, "photo uploaded");
        Ok(())
    }

    // ── Clientes ────────────────────────────────────────────────────────────

    pub async fn cadastrar_cliente(&self, input: &CadastrarClienteInput) -> CrmResult<Cliente> {
        let result: Cliente = self.post("/clientes", input).await?;
        tracing::info!(id = result.id, "cliente registered");
        Ok(result)
    }

    pub async fn buscar_clientes(
        &self,
        filtros: &FiltrosCliente,
    ) -> CrmResult<PaginatedResponse<Cliente>> {
        let result: PaginatedResponse<Cliente> =
            self.get(&with_query("/clientes", filtros)).await?;
        tracing::info!(total = result.total, "clientes searched");
        Ok(result)
    }

    // ── Reservas ────────────────────────────────────────────────────────────

    pub async fn criar_reserva(&self, input: &CriarReservaInput) -> CrmResult<Reserva> {
        let result: Reserva = self.post("/reservas", input).await?;
        tracing::info!(id = result.id, "reserva created");
        Ok(result)
    }

    pub async fn listar_reservas(
        &self,
        filtros: &FiltrosReserva,
    ) -> CrmResult<PaginatedResponse<Reserva>> {
        let result: PaginatedResponse<Reserva> =
            self.get(&with_query("/reservas", filtros)).await?;
        tracing::info!(total = result.total, "reservas listed");
        Ok(result)
    }

    pub async fn informar_venda(&self, id: u64, input: &InformarVendaInput) -> CrmResult<()> {
        let _: IgnoredAny = self
            .post(&format!("/reservas/{}/informar-venda", id), input)
            .await?;
        tracing::info!(reserva_id = id, "sale reported");
        Ok(())
    }

    pub async fn processar_distrato(
        &self,
        id: u64,
        input: &ProcessarDistratoInput,
    ) -> CrmResult<()> {
        let _: IgnoredAny = self
            .post(&format!("/reservas/{}/distrato", id), input)
            .await?;
        tracing::info!(reserva_id = id, "distrato processed");
        Ok(())
    }

    pub async fn listar_parcelas(&self, reserva_id: u64) -> CrmResult<Vec<Parcela>> {
        let payload: ListPayload<Parcela> = self
            .get(&format!("/reservas/{}/parcelas", reserva_id))
            .await?;
        Ok(payload.into_vec())
    }

    // ── Financeiro / comissões ──────────────────────────────────────────────

    pub async fn gerar_segunda_via_boleto(&self, input: &GerarBoletoInput) -> CrmResult<Boleto> {
        let boleto: Boleto = self.post("/financeiro/boletos/segunda-via", input).await?;
        tracing::info!(parcela_id = input.parcela_id, "boleto reissued");
        Ok(boleto)
    }

    pub async fn listar_comissoes(
        &self,
        filtros: &FiltrosComissao,
    ) -> CrmResult<PaginatedResponse<Comissao>> {
        let result: PaginatedResponse<Comissao> =
            self.get(&with_query("/comissoes", filtros)).await?;
        tracing::info!(total = result.total, "comissoes listed");
        Ok(result)
    }

    pub async fn alterar_situacao_comissao(
        &self,
        id: u64,
        input: &AlterarSituacaoComissaoInput,
    ) -> CrmResult<()> {
        let _: IgnoredAny = self
            .post(&format!("/comissoes/{}/alterar-situacao", id), input)
            .await?;
        tracing::info!(comissao_id = id, situacao = %input.situacao, "comissao status changed");
        Ok(())
    }

    // ── Cadastros gerais (cached) ───────────────────────────────────────────

    pub async fn listar_empreendimentos(&self) -> CrmResult<Vec<Empreendimento>> {
        let key = self.keys.empreendimentos();
        self.cached(&key, CADASTRO_TTL_SECS, async {
            let envelope: DataEnvelope<Empreendimento> = self.get("/empreendimentos").await?;
            tracing::info!(total = envelope.data.len(), "empreendimentos listed");
            Ok(envelope.data)
        })
        .await
    }

    pub async fn listar_unidades_disponiveis(&self, empreendimento_id: u64) -> CrmResult<Vec<Unidade>> {
        let payload: ListPayload<Unidade> = self
            .get(&format!(
                "/empreendimentos/{}/unidades?disponivel=true",
                empreendimento_id
            ))
            .await?;
        Ok(payload.into_vec())
    }

    pub async fn listar_workflows(&self, funcionalidade: &str) -> CrmResult<Workflow> {
        let key = self.keys.workflows(funcionalidade);
        self.cached(&key, CADASTRO_TTL_SECS, async {
            let path = format!("/workflows/{}", urlencode_segment(funcionalidade));
            let workflow: Workflow = self.get(&path).await?;
            tracing::info!(funcionalidade = %funcionalidade, "workflows listed");
            Ok(workflow)
        })
        .await
    }

    pub async fn listar_estados(&self) -> CrmResult<Vec<Estado>> {
        let key = self.keys.estados();
        self.cached(&key, GEO_TTL_SECS, async {
            let envelope: DataEnvelope<Estado> = self.get("/localidades/estados").await?;
            tracing::info!(total = envelope.data.len(), "estados listed");
            Ok(envelope.data)
        })
        .await
    }

    pub async fn listar_cidades(&self, estado_id: u64) -> CrmResult<Vec<Cidade>> {
        let key = self.keys.cidades(estado_id);
        self.cached(&key, GEO_TTL_SECS, async {
            let envelope: DataEnvelope<Cidade> = self
                .get(&format!("/localidades/cidades?estadoId={}", estado_id))
                .await?;
            tracing::info!(estado_id, total = envelope.data.len(), "cidades listed");
            Ok(envelope.data)
        })
        .await
    }
}

/// `mensagem`, then `message`, from a JSON error body.
fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["mensagem", "message"].iter().find_map(|field| {
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Append the non-null fields of a filter struct as a query string.
pub(crate) fn with_query<F: Serialize>(path: &str, filters: &F) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Ok(Value::Object(fields)) = serde_json::to_value(filters) {
        for (name, value) in fields {
            match value {
                Value::Null => {}
                Value::String(s) => {
                    query.append_pair(&name, &s);
                }
                other => {
                    query.append_pair(&name, &other.to_string());
                }
            }
        }
    }
    let query = query.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}

fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}
