// In-process store with per-entry deadlines. Expired entries are evicted
// lazily on access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::CrmResult;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store without expiry (TTL reports -1).
    #[cfg(test)]
    async fn set(&self, key: &str, value: &str) {
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> CrmResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(e) if !e.is_expired(now) => return Ok(Some(e.value.clone())),
                Some(_) => {}
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CrmResult<()> {
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> CrmResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> CrmResult<i64> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(match entries.get(key) {
            None => -2,
            Some(e) if e.is_expired(now) => -2,
            Some(Entry {
                expires_at: None, ..
            }) => -1,
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => {
                // Round up like Redis does for a freshly written key.
                let remaining = deadline.saturating_duration_since(now);
                remaining.as_secs_f64().ceil() as i64
            }
        })
    }

    async fn take(&self, key: &str) -> CrmResult<Option<String>> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.filter(|e| !e.is_expired(now)).map(|e| e.value))
    }

    async fn ping(&self) -> CrmResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_ex_then_get_round_trips() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        let ttl = store.ttl("k").await.unwrap();
        assert!(ttl > 0 && ttl <= 60, "ttl was {}", ttl);
    }

    #[tokio::test]
    async fn ttl_follows_redis_conventions() {
        let store = MemoryStore::new();
        assert_eq!(store.ttl("missing").await.unwrap(), -2);
        store.set("forever", "x").await;
        assert_eq!(store.ttl("forever").await.unwrap(), -1);
    }

    #[tokio::test]
    async fn zero_ttl_entries_are_already_expired() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), -2);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn take_consumes_the_value() {
        let store = MemoryStore::new();
        store.set_ex("code", "123456", 300).await.unwrap();
        assert_eq!(store.take("code").await.unwrap().as_deref(), Some("123456"));
        assert_eq!(store.take("code").await.unwrap(), None);
        assert_eq!(store.get("code").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_ex_overwrites_previous_value() {
        let store = MemoryStore::new();
        store.set_ex("k", "old", 60).await.unwrap();
        store.set_ex("k", "new", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }
}
