//! Key-value cache used by the auth manager and the cadastro lookups.
//!
//! The store is an external collaborator (Redis in production). All the
//! bridge needs from it is TTL-based string storage, so the contract is a
//! small async trait with two backends:
//!
//! - [`RedisStore`]: `redis` crate over a tokio `ConnectionManager`.
//! - [`MemoryStore`]: in-process map with deadlines, for tests and
//!   single-process development.

mod memory;
mod redis_store;

use async_trait::async_trait;

use crate::error::CrmResult;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Auth token lifetime in the cache: 25 min, five minutes shy of the
/// upstream token's real expiry.
pub const TOKEN_TTL_SECS: u64 = 25 * 60;
/// Verification code hand-off window.
pub const VERIFICATION_CODE_TTL_SECS: u64 = 5 * 60;
/// Slow-changing registry data (developments, workflows).
pub const CADASTRO_TTL_SECS: u64 = 60 * 60;
/// Geographic data (states, cities).
pub const GEO_TTL_SECS: u64 = 24 * 60 * 60;

/// TTL-based string store. Every failure is a `CrmError::Cache`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> CrmResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CrmResult<()>;

    async fn del(&self, key: &str) -> CrmResult<()>;

    /// Remaining TTL in seconds. Redis conventions: -1 = no expiry, -2 = missing.
    async fn ttl(&self, key: &str) -> CrmResult<i64>;

    /// Read a value and delete it so it can never be read twice.
    async fn take(&self, key: &str) -> CrmResult<Option<String>> {
        let value = self.get(key).await?;
        if value.is_some() {
            self.del(key).await?;
        }
        Ok(value)
    }

    async fn ping(&self) -> CrmResult<()>;
}

/// Deterministic key layout, one slot per identity.
#[derive(Debug, Clone)]
pub struct CacheKeys {
    namespace: String,
}

impl CacheKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn token(&self, domain: &str, user: &str) -> String {
        format!("{}:token:{}:{}", self.namespace, domain, user)
    }

    pub fn verification_code(&self, user: &str) -> String {
        format!("{}:code:{}", self.namespace, user)
    }

    pub fn empreendimentos(&self) -> String {
        format!("{}:cache:empreendimentos", self.namespace)
    }

    pub fn workflows(&self, funcionalidade: &str) -> String {
        format!("{}:cache:workflows:{}", self.namespace, funcionalidade)
    }

    pub fn estados(&self) -> String {
        format!("{}:cache:estados", self.namespace)
    }

    pub fn cidades(&self, estado_id: u64) -> String {
        format!("{}:cache:cidades:{}", self.namespace, estado_id)
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new("cvcrm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_key_is_namespaced_per_identity() {
        let keys = CacheKeys::default();
        assert_eq!(
            keys.token("acme", "ops@acme.com.br"),
            "cvcrm:token:acme:ops@acme.com.br"
        );
        assert_eq!(keys.verification_code("ops@acme.com.br"), "cvcrm:code:ops@acme.com.br");
    }

    #[test]
    fn custom_namespace_applies_to_every_key() {
        let keys = CacheKeys::new("staging");
        assert_eq!(keys.estados(), "staging:cache:estados");
        assert_eq!(keys.cidades(35), "staging:cache:cidades:35");
        assert_eq!(keys.workflows("reservas"), "staging:cache:workflows:reservas");
    }

    #[test]
    fn token_ttl_expires_before_upstream_lifetime() {
        assert_eq!(TOKEN_TTL_SECS, 1500);
        assert_eq!(VERIFICATION_CODE_TTL_SECS, 300);
    }
}
