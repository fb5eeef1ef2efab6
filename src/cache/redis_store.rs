// Redis backend. `ConnectionManager` reconnects on its own and is cheap to
// clone, so every command works on a fresh handle.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::KeyValueStore;
use crate::error::{CrmError, CrmResult};

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> CrmResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CrmError::Cache(format!("invalid Redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CrmError::Cache(format!("cannot connect to Redis: {}", e)))?;
        tracing::info!("Redis connection established");
        Ok(Self { conn })
    }
}

fn cache_error(op: &str, key: &str, e: redis::RedisError) -> CrmError {
    tracing::error!(op = op, key = %key, "cache operation failed: {}", e);
    match op {
        "GET" | "GETDEL" | "TTL" => CrmError::Cache(format!("failed to read cache: {}", key)),
        "DEL" => CrmError::Cache(format!("failed to delete cache: {}", key)),
        _ => CrmError::Cache(format!("failed to write cache: {}", key)),
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> CrmResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(|e| cache_error("GET", key, e))?;
        tracing::debug!(key = %key, hit = value.is_some(), "cache GET");
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CrmResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| cache_error("SETEX", key, e))?;
        tracing::debug!(key = %key, ttl = ttl_secs, "cache SETEX");
        Ok(())
    }

    async fn del(&self, key: &str) -> CrmResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| cache_error("DEL", key, e))?;
        tracing::debug!(key = %key, "cache DEL");
        Ok(())
    }

    async fn ttl(&self, key: &str) -> CrmResult<i64> {
        let mut conn = self.conn.clone();
        conn.ttl(key).await.map_err(|e| cache_error("TTL", key, e))
    }

    /// Atomic GETDEL, so two consumers can never both read the same code.
    async fn take(&self, key: &str) -> CrmResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get_del(key)
            .await
            .map_err(|e| cache_error("GETDEL", key, e))
    }

    async fn ping(&self) -> CrmResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("PING", "-", e))?;
        Ok(())
    }
}
