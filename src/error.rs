//! Error taxonomy shared by the cache, the auth manager, the request pipeline
//! and the tool layer.
//!
//! Nothing in the core swallows these; the transports turn them into
//! user-facing messages (MCP) or status codes (HTTP).

/// Every failure the CRM bridge can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrmError {
    /// The login flow failed at some step. Not retried automatically.
    #[error("{0}")]
    Authentication(String),

    /// The verification code was rejected upstream. A new code is required.
    #[error("{0}")]
    Token(String),

    /// Upstream answered with an HTTP error, or the call never got an answer.
    #[error("{message}")]
    ExternalApi { message: String, status: Option<u16> },

    #[error("{resource} '{identifier}' not found")]
    NotFound { resource: String, identifier: String },

    /// Upstream 422, or local argument validation before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Cache(String),

    #[error("{0}")]
    RateLimit(String),
}

pub type CrmResult<T> = Result<T, CrmError>;

impl CrmError {
    pub fn external(message: impl Into<String>, status: Option<u16>) -> Self {
        CrmError::ExternalApi {
            message: message.into(),
            status,
        }
    }

    pub fn not_found(resource: impl Into<String>, identifier: impl Into<String>) -> Self {
        CrmError::NotFound {
            resource: resource.into(),
            identifier: identifier.into(),
        }
    }

    /// `Token` is a refinement of `Authentication`; both count as auth errors.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, CrmError::Authentication(_) | CrmError::Token(_))
    }

    /// Upstream status code, when the error came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            CrmError::ExternalApi { status, .. } => *status,
            CrmError::NotFound { .. } => Some(404),
            CrmError::Validation(_) => Some(422),
            CrmError::RateLimit(_) => Some(429),
            _ => None,
        }
    }

    /// Transient upstream failures worth retrying later (5xx gateway family
    /// or a network failure with no response at all).
    pub fn is_recoverable(&self) -> bool {
        match self {
            CrmError::ExternalApi { status: None, .. } => true,
            CrmError::ExternalApi {
                status: Some(code), ..
            } => matches!(code, 500 | 502 | 503 | 504),
            CrmError::RateLimit(_) => true,
            _ => false,
        }
    }

    /// Machine-readable kind, used in logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CrmError::Authentication(_) => "AUTH_ERROR",
            CrmError::Token(_) => "TOKEN_ERROR",
            CrmError::ExternalApi { .. } => "EXTERNAL_API_ERROR",
            CrmError::NotFound { .. } => "NOT_FOUND",
            CrmError::Validation(_) => "VALIDATION_ERROR",
            CrmError::Cache(_) => "CACHE_ERROR",
            CrmError::RateLimit(_) => "RATE_LIMIT",
        }
    }
}
