// Router-level tests for the Luna mirror, the CRM token routes and the MCP
// endpoint. The CRM is a mockito server; the cache is the in-process store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mockito::Matcher;
use serde_json::{Value, json};
use tower::ServiceExt;

use cvcrm_mcp::cache::{CacheKeys, KeyValueStore, MemoryStore, TOKEN_TTL_SECS};
use cvcrm_mcp::config::{CrmConfig, GENERATE_TOKEN_ENDPOINT, VERIFICATION_CODE_ENDPOINT};
use cvcrm_mcp::state::AppState;

/// Helper: state wired to a mock CRM at `base_url`.
fn test_state(base_url: &str) -> AppState {
    let config = CrmConfig {
        domain: "acme".into(),
        user: "ops@acme.com.br".into(),
        cpf: "12345678901".into(),
        verification_code: Some("4321".into()),
        base_url: base_url.to_string(),
    };
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        CacheKeys::default(),
        config,
        reqwest::Client::new(),
        None,
    );
    state.mark_ready();
    state
}

/// Helper: put a token in the cache so no login happens.
async fn warm(state: &AppState, token: &str) {
    state
        .store
        .set_ex(state.auth.token_key(), token, TOKEN_TTL_SECS)
        .await
        .unwrap();
}

/// Helper: build a router from a test state.
fn app(state: AppState) -> axum::Router {
    cvcrm_mcp::create_router(state)
}

/// Helper: collect a response body into a serde_json::Value.
async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn mock_login(server: &mut mockito::ServerGuard, token: &str) -> (mockito::Mock, mockito::Mock) {
    let step1 = server
        .mock("POST", VERIFICATION_CODE_ENDPOINT)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sucesso":true,"mensagem":"ok","validadeMinutos":5}"#)
        .expect(1)
        .create_async()
        .await;
    let step2 = server
        .mock("POST", GENERATE_TOKEN_ENDPOINT)
        .match_body(Matcher::PartialJson(
            json!({"email": "ops@acme.com.br", "codigo": "4321"}),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"token": token}).to_string())
        .expect(1)
        .create_async()
        .await;
    (step1, step2)
}

async fn mock_identification(server: &mut mockito::ServerGuard, token: &str) -> (mockito::Mock, mockito::Mock) {
    let clientes = server
        .mock("GET", "/clientes")
        .match_query(Matcher::UrlEncoded("cpf".into(), "12345678901".into()))
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": [{
                    "id": 7,
                    "nome": "Maria Souza",
                    "cpf": "12345678901",
                    "email": "maria@example.com",
                    "celular": "11999990000"
                }],
                "total": 1
            })
            .to_string(),
        )
        .create_async()
        .await;
    let reservas = server
        .mock("GET", "/reservas")
        .match_query(Matcher::UrlEncoded("clienteId".into(), "7".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": [{
                    "id": 31,
                    "numero": "R-31",
                    "situacao": "ativa",
                    "unidadeId": 101,
                    "clienteIds": [7],
                    "valorTotal": 350000.0
                }],
                "total": 1
            })
            .to_string(),
        )
        .create_async()
        .await;
    (clientes, reservas)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Luna mirror
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn luna_lists_six_tools_with_aliases() {
    let response = app(test_state("http://127.0.0.1:9"))
        .oneshot(get("/api/luna"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let tools = json["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 6);
    let boleto = tools
        .iter()
        .find(|t| t["name"] == "luna_gerar_segunda_via_boleto")
        .unwrap();
    assert_eq!(boleto["alias"], "gerar-boleto");
    assert_eq!(boleto["method"], "POST");
    assert_eq!(boleto["parameters"]["required"], json!(["parcelaId"]));
}

#[tokio::test]
async fn luna_envelope_requires_tool_name() {
    let response = app(test_state("http://127.0.0.1:9"))
        .oneshot(post_json("/api/luna", json!({"arguments": {}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Tool name is required");
}

#[tokio::test]
async fn luna_envelope_rejects_back_office_tools() {
    let response = app(test_state("http://127.0.0.1:9"))
        .oneshot(post_json(
            "/api/luna",
            json!({"tool": "cvcrm_buscar_clientes", "arguments": {}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "Unknown tool: cvcrm_buscar_clientes"
    );
}

#[tokio::test]
async fn luna_envelope_identifies_client() {
    let mut server = mockito::Server::new_async().await;
    let (clientes, reservas) = mock_identification(&mut server, "tok-warm").await;
    let state = test_state(&server.url());
    warm(&state, "tok-warm").await;

    let response = app(state)
        .oneshot(post_json(
            "/api/luna",
            json!({"tool": "luna_identificar_cliente", "arguments": {"cpf": "12345678901"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["tool"], "luna_identificar_cliente");
    assert_eq!(json["data"]["encontrado"], true);
    assert_eq!(json["data"]["cliente"]["id"], 7);
    assert_eq!(json["data"]["cliente"]["telefone"], "11999990000");
    assert_eq!(json["data"]["unidades"][0]["id"], 101);
    assert_eq!(json["data"]["perfil"], "economico");
    clientes.assert_async().await;
    reservas.assert_async().await;
}

#[tokio::test]
async fn luna_alias_returns_bare_data() {
    let mut server = mockito::Server::new_async().await;
    let (clientes, _reservas) = mock_identification(&mut server, "tok-warm").await;
    let state = test_state(&server.url());
    warm(&state, "tok-warm").await;

    let response = app(state)
        .oneshot(post_json(
            "/api/luna/identificar-cliente",
            json!({"cpf": "12345678901", "nome": "maria"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["encontrado"], true);
    assert!(json.get("success").is_none());
    clientes.assert_async().await;
}

#[tokio::test]
async fn luna_alias_validates_before_calling_upstream() {
    let mut server = mockito::Server::new_async().await;
    let upstream = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let state = test_state(&server.url());
    warm(&state, "tok-warm").await;

    let response = app(state)
        .oneshot(post_json("/api/luna/identificar-cliente", json!({"cpf": "123"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("cpf must have 11 digits"));
    upstream.assert_async().await;
}

#[tokio::test]
async fn luna_unknown_alias_is_404() {
    let response = app(test_state("http://127.0.0.1:9"))
        .oneshot(post_json("/api/luna/emitir-nota", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Unknown tool: emitir-nota");
}

#[tokio::test]
async fn upstream_401_renews_token_and_reports_error() {
    let mut server = mockito::Server::new_async().await;
    let boleto = server
        .mock("POST", "/financeiro/boletos/segunda-via")
        .match_header("authorization", "Bearer stale")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"mensagem":"Token inválido"}"#)
        .expect(1)
        .create_async()
        .await;
    let (step1, step2) = mock_login(&mut server, "fresh").await;
    let state = test_state(&server.url());
    warm(&state, "stale").await;

    let response = app(state.clone())
        .oneshot(post_json("/api/luna/gerar-boleto", json!({"parcelaId": 5})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["error"],
        "token expired and was renewed, try again"
    );
    assert_eq!(
        state.store.get(state.auth.token_key()).await.unwrap().as_deref(),
        Some("fresh")
    );
    boleto.assert_async().await;
    step1.assert_async().await;
    step2.assert_async().await;
}

#[tokio::test]
async fn upstream_rate_limit_maps_to_429() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/assistenciatecnica/assistencias")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body(r#"{"message":"slow down"}"#)
        .create_async()
        .await;
    let state = test_state(&server.url());
    warm(&state, "tok-warm").await;

    let response = app(state)
        .oneshot(post_json(
            "/api/luna",
            json!({"tool": "luna_consultar_chamados", "arguments": {"clienteId": 7}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "slow down");
}

// ═══════════════════════════════════════════════════════════════════════════
//  CRM token administration
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn auth_status_reflects_cached_token() {
    let state = test_state("http://127.0.0.1:9");
    let router = app(state.clone());

    let response = router.clone().oneshot(get("/api/auth/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["authenticated"], false);
    assert_eq!(json["tokenTTL"], -2);
    assert_eq!(json["expiresIn"], "expired");

    warm(&state, "tok-warm").await;
    let json = body_json(router.oneshot(get("/api/auth/status")).await.unwrap()).await;
    assert_eq!(json["authenticated"], true);
    let ttl = json["tokenTTL"].as_i64().unwrap();
    assert!(ttl > 1490 && ttl <= 1500);
    assert_eq!(json["tokenTTLMinutes"], ttl / 60);
    assert_eq!(json["expiresIn"], format!("{} minutes", ttl / 60));
}

#[tokio::test]
async fn code_webhook_stores_code_for_next_login() {
    let state = test_state("http://127.0.0.1:9");

    let response = app(state.clone())
        .oneshot(post_json("/api/auth/code", json!({"code": " 9876 "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
    assert_eq!(
        state
            .store
            .get(state.auth.verification_code_key())
            .await
            .unwrap()
            .as_deref(),
        Some("9876")
    );
}

#[tokio::test]
async fn code_webhook_rejects_empty_code() {
    let response = app(test_state("http://127.0.0.1:9"))
        .oneshot(post_json("/api/auth/code", json!({"code": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn refresh_route_replaces_token() {
    let mut server = mockito::Server::new_async().await;
    let (step1, step2) = mock_login(&mut server, "renewed").await;
    let state = test_state(&server.url());
    warm(&state, "old").await;

    let response = app(state.clone())
        .oneshot(post_json("/api/auth/refresh", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        state.store.get(state.auth.token_key()).await.unwrap().as_deref(),
        Some("renewed")
    );
    step1.assert_async().await;
    step2.assert_async().await;
}

#[tokio::test]
async fn refresh_route_reports_login_failure_as_401() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", VERIFICATION_CODE_ENDPOINT)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sucesso":false,"mensagem":"CPF não confere"}"#)
        .create_async()
        .await;
    let state = test_state(&server.url());
    warm(&state, "old").await;

    let response = app(state.clone())
        .oneshot(post_json("/api/auth/refresh", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    assert_eq!(json["error"]["message"], "CPF não confere");
    // the old token is gone even though the new login failed
    assert_eq!(state.store.get(state.auth.token_key()).await.unwrap(), None);
}

#[tokio::test]
async fn refresh_route_reports_upstream_outage_during_login_as_401() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", VERIFICATION_CODE_ENDPOINT)
        .with_status(500)
        .create_async()
        .await;
    let state = test_state(&server.url());
    warm(&state, "old").await;

    let response = app(state)
        .oneshot(post_json("/api/auth/refresh", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("CV CRM authentication failed")
    );
}

#[tokio::test]
async fn logout_route_discards_token() {
    let state = test_state("http://127.0.0.1:9");
    warm(&state, "tok-warm").await;

    let response = app(state.clone())
        .oneshot(post_json("/api/auth/logout", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.store.get(state.auth.token_key()).await.unwrap(), None);
}

// ═══════════════════════════════════════════════════════════════════════════
//  MCP over HTTP
// ═══════════════════════════════════════════════════════════════════════════

async fn rpc(state: AppState, body: Value) -> Value {
    let response = app(state).oneshot(post_json("/mcp", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn mcp_initialize_reports_server_info() {
    let json = rpc(
        test_state("http://127.0.0.1:9"),
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;

    assert_eq!(json["id"], 1);
    assert_eq!(json["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(json["result"]["serverInfo"]["name"], "CV CRM MCP Server");
    assert!(json["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn mcp_initialized_notification_gets_empty_body() {
    let json = rpc(
        test_state("http://127.0.0.1:9"),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;

    assert_eq!(json, json!({}));
}

#[tokio::test]
async fn mcp_cancel_notification_gets_empty_body() {
    let json = rpc(
        test_state("http://127.0.0.1:9"),
        json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 3}}),
    )
    .await;

    assert_eq!(json, json!({}));
}

#[tokio::test]
async fn mcp_tools_list_has_all_tools() {
    let json = rpc(
        test_state("http://127.0.0.1:9"),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await;

    let tools = json["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 13);
    assert!(tools.iter().any(|t| t["name"] == "cvcrm_informar_venda"));
    assert!(tools.iter().any(|t| t["name"] == "luna_listar_empreendimentos_disponiveis"));
}

#[tokio::test]
async fn mcp_tool_call_returns_markdown() {
    let mut server = mockito::Server::new_async().await;
    let (clientes, _) = mock_identification(&mut server, "tok-warm").await;
    let state = test_state(&server.url());
    warm(&state, "tok-warm").await;

    let json = rpc(
        state,
        json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": {"name": "cvcrm_buscar_clientes", "arguments": {"cpf": "12345678901"}}
        }),
    )
    .await;

    assert_eq!(json["result"]["isError"], false);
    let text = json["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("**Maria Souza**"));
    assert!(text.contains("1 total"));
    clientes.assert_async().await;
}

#[tokio::test]
async fn mcp_tool_failure_is_an_error_result_not_a_protocol_error() {
    let json = rpc(
        test_state("http://127.0.0.1:9"),
        json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {"name": "cvcrm_criar_atendimento", "arguments": {"assunto": "oi", "descricao": "curta", "clienteId": 1}}
        }),
    )
    .await;

    assert!(json.get("error").is_none());
    assert_eq!(json["result"]["isError"], true);
    let text = json["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("❌ **Error executing cvcrm_criar_atendimento**"));
    assert!(text.contains("assunto must have at least 5 characters"));
    assert!(text.contains("descricao must have at least 10 characters"));
}

#[tokio::test]
async fn mcp_unknown_tool_is_an_error_result() {
    let json = rpc(
        test_state("http://127.0.0.1:9"),
        json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": {"name": "cvcrm_apagar_tudo", "arguments": {}}
        }),
    )
    .await;

    assert_eq!(json["result"]["isError"], true);
    let text = json["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Tool 'cvcrm_apagar_tudo' not found"));
}

#[tokio::test]
async fn mcp_protocol_errors() {
    let state = test_state("http://127.0.0.1:9");

    let json = rpc(
        state.clone(),
        json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {}}),
    )
    .await;
    assert_eq!(json["error"]["code"], -32602);

    let json = rpc(
        state.clone(),
        json!({"jsonrpc": "2.0", "id": 7, "method": "prompts/list"}),
    )
    .await;
    assert_eq!(json["error"]["code"], -32601);

    let json = rpc(
        state,
        json!({"jsonrpc": "2.0", "id": 8, "method": "resources/read", "params": {"uri": "cvcrm://nope"}}),
    )
    .await;
    assert_eq!(json["error"]["code"], -32602);
}

#[tokio::test]
async fn mcp_resources_expose_config_and_auth_status() {
    let state = test_state("http://127.0.0.1:9");

    let json = rpc(
        state.clone(),
        json!({"jsonrpc": "2.0", "id": 9, "method": "resources/list"}),
    )
    .await;
    let uris: Vec<&str> = json["result"]["resources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["uri"].as_str())
        .collect();
    assert_eq!(
        uris,
        vec!["cvcrm://auth/status", "cvcrm://empreendimentos", "cvcrm://config"]
    );

    let json = rpc(
        state.clone(),
        json!({"jsonrpc": "2.0", "id": 10, "method": "resources/read", "params": {"uri": "cvcrm://config"}}),
    )
    .await;
    let text = json["result"]["contents"][0]["text"].as_str().unwrap();
    let config: Value = serde_json::from_str(text).unwrap();
    assert_eq!(config["dominio"], "acme");
    assert_eq!(config["name"], "CV CRM MCP Server");

    let json = rpc(
        state,
        json!({"jsonrpc": "2.0", "id": 11, "method": "resources/read", "params": {"uri": "cvcrm://auth/status"}}),
    )
    .await;
    let text = json["result"]["contents"][0]["text"].as_str().unwrap();
    let status: Value = serde_json::from_str(text).unwrap();
    assert_eq!(status["authenticated"], false);
}

#[tokio::test]
async fn mcp_resource_failure_is_reported_as_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/empreendimentos")
        .with_status(500)
        .with_body(r#"{"mensagem":"indisponível"}"#)
        .create_async()
        .await;
    let state = test_state(&server.url());
    warm(&state, "tok-warm").await;

    let json = rpc(
        state,
        json!({"jsonrpc": "2.0", "id": 12, "method": "resources/read", "params": {"uri": "cvcrm://empreendimentos"}}),
    )
    .await;

    let content = &json["result"]["contents"][0];
    assert_eq!(content["mimeType"], "text/plain");
    assert_eq!(content["text"], "Error reading resource: indisponível");
}
