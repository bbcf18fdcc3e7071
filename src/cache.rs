//! Keyed query cache.
//!
//! Entries are JSON snapshots keyed by request key (`{tenant}:{resource}`).
//! A fresh entry is served without calling the fetcher; a stale or missing
//! one is refetched. Failed fetches leave the cache untouched. Fetches are
//! not deduplicated or cancelled: when two overlap, the one that completes
//! last is what stays cached.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::ApiError;

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    fetched_at: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.fetched_at.elapsed() < stale_time
    }
}

#[derive(Debug)]
pub struct QueryCache {
    entries: RwLock<HashMap<String, Entry>>,
    stale_time: Duration,
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_time,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.query_stale_time)
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Cached value if fresh, otherwise the result of `fetch`.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.fresh(key).await {
            tracing::trace!(key, "query cache hit");
            return Ok(value);
        }

        tracing::trace!(key, "query cache miss");
        let value = fetch().await?;
        self.set(key, &value).await;
        Ok(value)
    }

    /// Any cached value, fresh or not.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "value not cacheable");
                return;
            }
        };
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value,
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
    }

    /// Mark one entry stale. The value stays readable through `get`.
    pub async fn invalidate(&self, key: &str) -> bool {
        match self.entries.write().await.get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    /// Mark every entry under `prefix` stale. Returns how many.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let mut count = 0;
        for (_, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
            entry.invalidated = true;
            count += 1;
        }
        tracing::debug!(prefix, count, "invalidated cached queries");
        count
    }

    pub async fn is_fresh(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|e| e.is_fresh(self.stale_time))
    }

    /// Drop everything (sign-out, tenant switch).
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn fresh<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(key).filter(|e| e.is_fresh(self.stale_time))?;
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "cached value has a different shape, refetching");
                None
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn fetch_counted(counter: &AtomicUsize, value: &str) -> Result<Vec<String>, ApiError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![value.to_string()])
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_fetch() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch("acme:agents", || fetch_counted(&calls, "a1"))
            .await
            .unwrap();
        let second = cache
            .get_or_fetch("acme:agents", || fetch_counted(&calls, "a2"))
            .await
            .unwrap();

        assert_eq!(first, vec!["a1"]);
        assert_eq!(second, vec!["a1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        cache
            .get_or_fetch("acme:agents", || fetch_counted(&calls, "a1"))
            .await
            .unwrap();

        assert!(cache.invalidate("acme:agents").await);
        assert!(!cache.is_fresh("acme:agents").await);
        assert_eq!(cache.get::<Vec<String>>("acme:agents").await, Some(vec!["a1".into()]));

        let refreshed = cache
            .get_or_fetch("acme:agents", || fetch_counted(&calls, "a2"))
            .await
            .unwrap();
        assert_eq!(refreshed, vec!["a2"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_is_tenant_scoped() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.set("acme:agents", &1).await;
        cache.set("acme:executions", &2).await;
        cache.set("globex:agents", &3).await;

        assert_eq!(cache.invalidate_prefix("acme:").await, 2);
        assert!(cache.is_fresh("globex:agents").await);
        assert!(!cache.is_fresh("acme:executions").await);
    }

    #[tokio::test]
    async fn test_failed_fetch_not_cached() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let result: Result<Vec<String>, ApiError> = cache
            .get_or_fetch("acme:agents", || async { Err(ApiError::new(503, "down")) })
            .await;
        assert_eq!(result.unwrap_err().status, 503);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_zero_stale_time_always_refetches() {
        let cache = QueryCache::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            cache
                .get_or_fetch("acme:agents", || fetch_counted(&calls, "a1"))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
