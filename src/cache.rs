//! In-memory query cache and stale-response guard.
//!
//! Entries are addressed by a [`QueryKey`]: the operation name plus a stable JSON
//! serialization of its parameters. Values are stored as JSON together with the
//! time they were fetched. Writers invalidate the keys their insert affects.
//!
//! [`LatestOnly`] holds the data a view displays and only accepts a response whose
//! key is still the selected one, so a slow fetch for an abandoned selection can
//! never overwrite newer state.

use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::HashMap, fmt, future::Future};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Cache key: operation name + serialized parameter tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    operation: &'static str,
    params: String,
}

impl QueryKey {
    /// Builds a key from an operation name and its parameters.
    pub fn new<P: Serialize + ?Sized>(operation: &'static str, params: &P) -> Result<Self> {
        Ok(Self {
            operation,
            params: serde_json::to_string(params)?,
        })
    }

    /// Key for an operation without parameters.
    #[must_use]
    pub fn fixed(operation: &'static str) -> Self {
        Self {
            operation,
            params: String::new(),
        }
    }

    /// The operation half of the key.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(self.operation)
        } else {
            write!(f, "{}:{}", self.operation, self.params)
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: serde_json::Value,
    fetched_at: DateTime<Utc>,
}

/// Read-through cache shared by the readers.
#[derive(Debug)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    ttl: Duration,
}

impl QueryCache {
    /// Creates an empty cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached value for `key` if present and not expired.
    ///
    /// An expired entry is removed.
    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            let Some(entry) = entries.get(key) else {
                return Ok(None);
            };
            if !self.is_expired(entry, now) {
                return Ok(Some(serde_json::from_value(entry.value.clone())?));
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| self.is_expired(e, now)) {
            entries.remove(key);
            trace!("Cache entry {key} expired");
        }
        Ok(None)
    }

    /// Stores `value` under `key`, replacing any previous entry and dropping
    /// every expired one.
    pub async fn put<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<()> {
        let now = Utc::now();
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            fetched_at: now,
        };
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !self.is_expired(e, now));
        let evicted = before - entries.len();
        if evicted > 0 {
            trace!("Evicted {evicted} expired cache entries");
        }
        entries.insert(key, entry);
        Ok(())
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at > self.ttl
    }

    /// Returns the cached value or runs `fetch` and caches its result.
    ///
    /// Errors from `fetch` are returned as-is and nothing is cached. The lock is
    /// not held while `fetch` runs.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(&key).await? {
            debug!("Cache hit for {key}");
            return Ok(hit);
        }

        debug!("Cache miss for {key}");
        let value = fetch().await?;
        self.put(key, &value).await?;
        Ok(value)
    }

    /// Drops the entry for `key`. Returns whether an entry existed.
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            debug!("Invalidated cache entry {key}");
        }
        removed
    }

    /// Drops every entry of `operation`. Returns how many were removed.
    pub async fn invalidate_operation(&self, operation: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.operation != operation);
        let removed = before - entries.len();
        debug!("Invalidated {removed} cache entries for {operation}");
        removed
    }

    /// When the entry for `key` was fetched, if cached.
    pub async fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.read().await.get(key).map(|e| e.fetched_at)
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// The value a view currently shows, tied to the key it was selected for.
#[derive(Debug)]
pub struct LatestOnly<T> {
    current: Option<QueryKey>,
    value: Option<T>,
}

impl<T> Default for LatestOnly<T> {
    fn default() -> Self {
        Self {
            current: None,
            value: None,
        }
    }
}

impl<T> LatestOnly<T> {
    /// Creates an empty slot with nothing selected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: None,
            value: None,
        }
    }

    /// Makes `key` the selected key. Displayed data is cleared when the key changes.
    pub fn select(&mut self, key: QueryKey) {
        if self.current.as_ref() != Some(&key) {
            self.value = None;
            self.current = Some(key);
        }
    }

    /// Stores `value` if `key` is still selected. Returns false for stale responses.
    pub fn apply(&mut self, key: &QueryKey, value: T) -> bool {
        if self.current.as_ref() == Some(key) {
            self.value = Some(value);
            true
        } else {
            trace!("Dropping stale response for {key}");
            false
        }
    }

    /// The selected key.
    #[must_use]
    pub const fn current(&self) -> Option<&QueryKey> {
        self.current.as_ref()
    }

    /// The displayed value.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_key_depends_on_full_parameter_tuple() {
        let a = QueryKey::new("market-rate-history", &("paper", "Mumbai", 7)).unwrap();
        let b = QueryKey::new("market-rate-history", &("paper", "Mumbai", 30)).unwrap();
        let c = QueryKey::new("market-rate-history", &("paper", "Mumbai", 7)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.to_string(), r#"market-rate-history:["paper","Mumbai",7]"#);
        assert_eq!(QueryKey::fixed("scrap-categories").to_string(), "scrap-categories");
    }

    #[tokio::test]
    async fn test_get_or_fetch_reads_through_once() -> Result<()> {
        let cache = QueryCache::new(Duration::minutes(5));
        let calls = AtomicUsize::new(0);
        let key = QueryKey::fixed("numbers");

        for _ in 0..3 {
            let value: Vec<i32> = cache
                .get_or_fetch(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await?;
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.fetched_at(&key).await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() -> Result<()> {
        let cache = QueryCache::new(Duration::minutes(5));
        let key = QueryKey::fixed("failing");

        let result: Result<Vec<i32>> = cache
            .get_or_fetch(key.clone(), || async { Err(Error::Auth) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() -> Result<()> {
        let cache = QueryCache::new(Duration::seconds(-1));
        let key = QueryKey::fixed("expiring");
        cache.put(key.clone(), &1_u32).await?;
        let hit: Option<u32> = cache.get(&key).await?;
        assert!(hit.is_none());
        assert!(cache.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_evicts_expired_entries() -> Result<()> {
        let cache = QueryCache::new(Duration::seconds(-1));
        for day in ["2025-03-01", "2025-03-02", "2025-03-03"] {
            cache.put(QueryKey::new("market-rate-history", &day)?, &1_u32).await?;
            assert_eq!(cache.len().await, 1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_invalidate_operation_leaves_other_keys() -> Result<()> {
        let cache = QueryCache::new(Duration::minutes(5));
        cache.put(QueryKey::new("user-bookings", &"u1")?, &1).await?;
        cache.put(QueryKey::new("user-bookings", &"u2")?, &2).await?;
        cache.put(QueryKey::fixed("scrap-categories"), &3).await?;

        assert!(cache.invalidate(&QueryKey::new("user-bookings", &"u1")?).await);
        assert_eq!(cache.invalidate_operation("user-bookings").await, 1);
        assert_eq!(cache.len().await, 1);
        Ok(())
    }

    #[test]
    fn test_latest_only_drops_stale_response() {
        let first = QueryKey::new("history", &"paper").unwrap();
        let second = QueryKey::new("history", &"metal").unwrap();
        let mut slot = LatestOnly::new();

        slot.select(first.clone());
        slot.select(second.clone());

        assert!(slot.apply(&second, "metal data"));
        assert!(!slot.apply(&first, "paper data"));
        assert_eq!(slot.value(), Some(&"metal data"));
        assert_eq!(slot.current(), Some(&second));
    }

    #[test]
    fn test_reselecting_same_key_keeps_value() {
        let key = QueryKey::new("history", &"paper").unwrap();
        let mut slot = LatestOnly::new();
        slot.select(key.clone());
        assert!(slot.apply(&key, 5));
        slot.select(key);
        assert_eq!(slot.value(), Some(&5));
    }
}
