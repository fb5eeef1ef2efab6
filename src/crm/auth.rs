// CV CRM bridge - token lifecycle
// Two-step code login against the CRM, token cached in the key-value store
// under one slot per (domain, user). A process-local mutex keeps concurrent
// cache misses from running the login flow more than once.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;

use super::request_timeout;
use super::types::{GenerateTokenBody, GenerateTokenResponse, RequestCodeBody, RequestCodeResponse};
use crate::cache::{CacheKeys, KeyValueStore, TOKEN_TTL_SECS, VERIFICATION_CODE_TTL_SECS};
use crate::config::{CrmConfig, GENERATE_TOKEN_ENDPOINT, VERIFICATION_CODE_ENDPOINT};
use crate::error::{CrmError, CrmResult};

/// Snapshot of the cached token, as exposed by `cvcrm://auth/status`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(rename = "tokenTTL")]
    pub token_ttl: i64,
    #[serde(rename = "tokenTTLMinutes")]
    pub token_ttl_minutes: i64,
    #[serde(rename = "expiresIn")]
    pub expires_in: String,
}

impl AuthStatus {
    fn from_ttl(ttl: i64) -> Self {
        Self {
            authenticated: ttl > 0,
            token_ttl: ttl,
            token_ttl_minutes: ttl.div_euclid(60),
            expires_in: if ttl > 0 {
                format!("{} minutes", ttl / 60)
            } else {
                "expired".to_string()
            },
        }
    }
}

pub struct AuthManager {
    store: Arc<dyn KeyValueStore>,
    config: CrmConfig,
    http: reqwest::Client,
    token_key: String,
    code_key: String,
    login_lock: Mutex<()>,
}

impl AuthManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keys: &CacheKeys,
        config: CrmConfig,
        http: reqwest::Client,
    ) -> Self {
        let token_key = keys.token(&config.domain, &config.user);
        let code_key = keys.verification_code(&config.user);
        Self {
            store,
            config,
            http,
            token_key,
            code_key,
            login_lock: Mutex::new(()),
        }
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    pub fn verification_code_key(&self) -> &str {
        &self.code_key
    }

    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    // ── Token access ────────────────────────────────────────────────────────

    /// Cached token if present, otherwise a fresh login. A miss is the
    /// normal path, never an error.
    pub async fn get_token(&self) -> CrmResult<String> {
        if let Some(token) = self.store.get(&self.token_key).await? {
            tracing::debug!("token served from cache");
            return Ok(token);
        }

        let _guard = self.login_lock.lock().await;
        // Another task may have finished logging in while we waited.
        if let Some(token) = self.store.get(&self.token_key).await? {
            tracing::debug!("token populated by a concurrent login");
            return Ok(token);
        }
        tracing::info!("no cached token, authenticating");
        self.login().await
    }

    /// Unconditional login.
    pub async fn authenticate(&self) -> CrmResult<String> {
        let _guard = self.login_lock.lock().await;
        self.login().await
    }

    /// Drop the cached token, then log in again. The delete happens first so
    /// a failed login never leaves the stale token readable.
    pub async fn refresh_token(&self) -> CrmResult<String> {
        let _guard = self.login_lock.lock().await;
        tracing::info!("forcing token renewal");
        self.store.del(&self.token_key).await?;
        self.login().await
    }

    /// Logout.
    pub async fn invalidate_token(&self) -> CrmResult<()> {
        self.store.del(&self.token_key).await?;
        tracing::info!("token invalidated");
        Ok(())
    }

    pub async fn is_token_valid(&self) -> CrmResult<bool> {
        Ok(self.token_ttl().await? > 0)
    }

    /// Raw remaining TTL; -1/-2 pass through from the store.
    pub async fn token_ttl(&self) -> CrmResult<i64> {
        self.store.ttl(&self.token_key).await
    }

    pub async fn status(&self) -> CrmResult<AuthStatus> {
        Ok(AuthStatus::from_ttl(self.token_ttl().await?))
    }

    /// Write side of the verification-code hand-off (webhooks, operators).
    pub async fn store_verification_code(&self, code: &str) -> CrmResult<()> {
        self.store
            .set_ex(&self.code_key, code, VERIFICATION_CODE_TTL_SECS)
            .await?;
        tracing::info!(ttl = VERIFICATION_CODE_TTL_SECS, "verification code stored");
        Ok(())
    }

    // ── Login flow ──────────────────────────────────────────────────────────
    /// Caller must hold `login_lock`. Fails only with `Authentication` or `Token`.
    /// Caller must hold `login_lock`.
    async fn login(&self) -> CrmResult<String> {
        let start = Instant::now();
        tracing::info!(domain = %self.config.domain, "CV CRM authentication started");

        let result: CrmResult<String> = async {
            self.request_verification_code().await?;
            let code = self.resolve_verification_code().await?;
            let token = self.generate_token(&code).await?;
            self.store
                .set_ex(&self.token_key, &token, TOKEN_TTL_SECS)
                .await?;
            tracing::info!(ttl = TOKEN_TTL_SECS, "token cached");
            Ok(token)
        }
        .await;

        match result {
            Ok(token) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "CV CRM authentication succeeded"
                );
                Ok(token)
            }
            Err(e) => {
                tracing::error!(kind = e.kind(), "CV CRM authentication failed: {}", e);
                Err(match e {
                    auth @ (CrmError::Authentication(_) | CrmError::Token(_)) => auth,
                    other => {
                        CrmError::Authentication(format!("CV CRM authentication failed: {}", other))
                    }
                })
            }
        }
    }

    /// Step 1. `sucesso: false` is a hard failure.
    async fn request_verification_code(&self) -> CrmResult<()> {
        let url = format!("{}{}", self.config.base_url, VERIFICATION_CODE_ENDPOINT);
        let resp = self
            .http
            .post(&url)
            .timeout(request_timeout())
            .json(&RequestCodeBody {
                email: &self.config.user,
                cpf: &self.config.cpf,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("verification code request did not complete: {}", e);
                CrmError::external("verification code request failed", None)
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CrmError::external(
                format!("verification code request failed: HTTP {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body: RequestCodeResponse = resp.json().await.map_err(|_| {
            CrmError::Authentication("malformed verification code response".to_string())
        })?;
        if !body.sucesso {
            return Err(CrmError::Authentication(
                body.mensagem
                    .unwrap_or_else(|| "verification code request was refused".to_string()),
            ));
        }

        tracing::info!(
            valid_minutes = ?body.validade_minutos,
            "verification code requested"
        );
        Ok(())
    }

    /// Step 2. Static config first, then a code pushed into the cache
    /// (consumed on read).
    pub async fn resolve_verification_code(&self) -> CrmResult<String> {
        if let Some(code) = &self.config.verification_code {
            tracing::debug!("using configured verification code");
            return Ok(code.clone());
        }

        if let Some(code) = self.store.take(&self.code_key).await? {
            tracing::info!("verification code taken from cache");
            return Ok(code);
        }

        Err(CrmError::Authentication(
            "verification code required: set CVCRM_VERIFICATION_CODE or push one to POST /api/auth/code"
                .to_string(),
        ))
    }

    /// Step 3. Upstream 401 means the code was wrong or expired.
    async fn generate_token(&self, code: &str) -> CrmResult<String> {
        let url = format!("{}{}", self.config.base_url, GENERATE_TOKEN_ENDPOINT);
        let resp = self
            .http
            .post(&url)
            .timeout(request_timeout())
            .json(&GenerateTokenBody {
                email: &self.config.user,
                codigo: code,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("token request did not complete: {}", e);
                CrmError::external("token generation request failed", None)
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CrmError::Token(
                "verification code is invalid or expired".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(CrmError::external(
                format!("token generation failed: HTTP {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body: GenerateTokenResponse = resp.json().await.map_err(|_| {
            CrmError::Authentication("malformed token response".to_string())
        })?;
        match body.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::info!(expires = ?body.expira_em, "token generated");
                Ok(token)
            }
            None => Err(CrmError::Authentication(
                "malformed success response: token missing".to_string(),
            )),
        }
    }
}
