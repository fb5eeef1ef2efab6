// CV CRM bridge - configuration
// Everything comes from the environment (after `.env` is loaded by main).
// Loaders take a lookup closure so tests never have to touch process env.

use std::sync::OnceLock;

use regex::Regex;

/// Provider hostname appended to the tenant domain.
pub const PROVIDER_HOST: &str = "cvcrm.com.br";
pub const API_BASE_PATH: &str = "/api/v1";

/// Fixed timeout for every outbound call to the CRM.
pub const REQUEST_TIMEOUT_MS: u64 = 30_000;

pub const VERIFICATION_CODE_ENDPOINT: &str = "/cliente/codigo-verificacao";
pub const GENERATE_TOKEN_ENDPOINT: &str = "/autenticacao/token";

pub const APP_NAME: &str = "CV CRM MCP Server";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static CPF_RE: OnceLock<Regex> = OnceLock::new();

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
        .is_match(value)
}

pub fn is_valid_cpf(value: &str) -> bool {
    CPF_RE
        .get_or_init(|| Regex::new(r"^\d{11}$").unwrap())
        .is_match(value)
}

#[derive(Debug, thiserror::Error)]
#[error("invalid {section} configuration:\n{}", .problems.join("\n"))]
pub struct ConfigError {
    pub section: &'static str,
    pub problems: Vec<String>,
}

// ── CRM credential ──────────────────────────────────────────────────────────

/// The single identity this deployment logs in as. Immutable after startup.
#[derive(Clone)]
pub struct CrmConfig {
    pub domain: String,
    pub user: String,
    pub cpf: String,
    /// Pre-shared verification code for non-interactive deployments.
    pub verification_code: Option<String>,
    pub base_url: String,
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("domain", &self.domain)
            .field("user", &self.user)
            .field("cpf", &"***")
            .field("verification_code", &self.verification_code.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CrmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let domain = lookup("CVCRM_DOMINIO").unwrap_or_default().trim().to_string();
        let user = lookup("CVCRM_USUARIO").unwrap_or_default().trim().to_string();
        let cpf = lookup("CVCRM_CPF").unwrap_or_default().trim().to_string();
        let verification_code = lookup("CVCRM_VERIFICATION_CODE")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let mut problems = Vec::new();
        if domain.is_empty() {
            problems.push("CVCRM_DOMINIO: domain is required".to_string());
        }
        if !is_valid_email(&user) {
            problems.push("CVCRM_USUARIO: invalid e-mail".to_string());
        }
        if !is_valid_cpf(&cpf) {
            problems.push("CVCRM_CPF: must be 11 digits without punctuation".to_string());
        }
        if !problems.is_empty() {
            return Err(ConfigError {
                section: "CV CRM",
                problems,
            });
        }

        let base_url = lookup("CVCRM_BASE_URL")
            .filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| base_url_for(&domain));

        Ok(Self {
            domain,
            user,
            cpf,
            verification_code,
            base_url,
        })
    }
}

/// `https://{domain}.cvcrm.com.br/api/v1`
pub fn base_url_for(domain: &str) -> String {
    format!("https://{}.{}{}", domain, PROVIDER_HOST, API_BASE_PATH)
}

// ── Cache ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Connection URL with `REDIS_PASSWORD` already folded in.
    pub url: String,
    pub namespace: String,
}

impl CacheConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let backend = match lookup("CACHE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("redis") => CacheBackend::Redis,
            Some("memory") => CacheBackend::Memory,
            Some(other) => {
                problems.push(format!("CACHE_BACKEND: unknown backend '{}'", other));
                CacheBackend::Redis
            }
        };

        let raw_url = lookup("REDIS_URL")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "redis://localhost:6379".to_string());
        let url = match url::Url::parse(&raw_url) {
            Ok(mut parsed) => {
                if let Some(password) = lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()) {
                    if parsed.password().is_none() && parsed.set_password(Some(&password)).is_err() {
                        problems.push("REDIS_PASSWORD: cannot be applied to REDIS_URL".to_string());
                    }
                }
                parsed.to_string()
            }
            Err(e) => {
                problems.push(format!("REDIS_URL: invalid URL ({})", e));
                raw_url
            }
        };

        if !problems.is_empty() {
            return Err(ConfigError {
                section: "Redis",
                problems,
            });
        }

        let namespace = lookup("CACHE_NAMESPACE")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "cvcrm".to_string());

        Ok(Self {
            backend,
            url,
            namespace,
        })
    }
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpTransport {
    Http,
    Stdio,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Optional inbound bearer secret. None = open (dev mode).
    pub auth_secret: Option<String>,
    pub transport: McpTransport,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let port = match lookup("PORT").filter(|p| !p.is_empty()) {
            None => 3000,
            Some(p) => p.parse::<u16>().unwrap_or_else(|_| {
                problems.push(format!("PORT: '{}' is not a valid port", p));
                3000
            }),
        };

        let transport = match lookup("MCP_TRANSPORT").as_deref().map(str::trim) {
            None | Some("") | Some("http") => McpTransport::Http,
            Some("stdio") => McpTransport::Stdio,
            Some(other) => {
                problems.push(format!("MCP_TRANSPORT: unknown transport '{}'", other));
                McpTransport::Http
            }
        };

        if !problems.is_empty() {
            return Err(ConfigError {
                section: "server",
                problems,
            });
        }

        Ok(Self {
            port,
            auth_secret: lookup("AUTH_SECRET").filter(|s| !s.is_empty()),
            transport,
        })
    }
}
