//! In-process store backend
//!
//! Holds entries in a `HashMap` behind a tokio Mutex. Contents are lost on
//! restart, which is acceptable for single-instance deployments where a lost
//! session only means the user restarts the authorization.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::{KvStore, StoreFuture};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Volatile key-value store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl KvStore for MemoryStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries
                .get(key)
                .filter(|e| !e.is_expired(Instant::now()))
                .map(|e| e.value.clone()))
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let now = Instant::now();
            let mut entries = self.entries.lock().await;
            // Lazy cleanup: drop expired entries while holding the lock
            entries.retain(|_, e| !e.is_expired(now));
            entries.insert(
                key.to_owned(),
                Entry {
                    value,
                    expires_at: ttl.map(|ttl| now + ttl),
                },
            );
            debug!(key, "stored value");
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            if entries.remove(key).is_some() {
                debug!(key, "deleted value");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn put_then_get_returns_exact_value() {
        let store = MemoryStore::new();
        store
            .put("accessToken", "at_ZXhhY3Q=".into(), None)
            .await
            .unwrap();
        assert_eq!(
            store.get("accessToken").await.unwrap().as_deref(),
            Some("at_ZXhhY3Q=")
        );
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("refreshToken").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_previous_value() {
        let store = MemoryStore::new();
        store.put("accessToken", "old".into(), None).await.unwrap();
        store.put("accessToken", "new".into(), None).await.unwrap();
        assert_eq!(store.get("accessToken").await.unwrap().as_deref(), Some("new"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_removes_and_is_idempotent() {
        let store = MemoryStore::new();
        store.put("state:abc", "abc".into(), None).await.unwrap();
        store.delete("state:abc").await.unwrap();
        assert!(store.get("state:abc").await.unwrap().is_none());
        store.delete("state:abc").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .put("verifier:abc", "v".into(), Some(Duration::from_secs(600)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(599)).await;
        assert_eq!(store.get("verifier:abc").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("verifier:abc").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_purged_on_write() {
        let store = MemoryStore::new();
        store
            .put("state:old", "old".into(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        store.put("accessToken", "at".into(), None).await.unwrap();

        let entries = store.entries.lock().await;
        assert!(!entries.contains_key("state:old"));
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_writes_to_distinct_keys_are_kept() {
        let store = Arc::new(MemoryStore::new());

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put(&format!("state:{i}"), i.to_string(), None)
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.len().await, 10);
        assert_eq!(store.get("state:7").await.unwrap().as_deref(), Some("7"));
    }
}
