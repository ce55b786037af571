//! In-process reference backend
//!
//! `MemoryBackend<B>` keeps entries in a `HashMap` behind a tokio `RwLock` and
//! serves any buffer type, so the same implementation backs native, text and
//! binary storage. Expired entries are dropped lazily when touched, or in bulk
//! through [`MemoryBackend::cleanup_expired`]. There is no eviction.

use crate::cache::backend::CacheBackend;
use crate::cache::config::CacheExpiration;
use crate::cache::entry::CacheEntry;
use crate::cache::types::{CacheKey, CacheTier};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Statistics for a memory backend
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of reads that found a live entry
    pub hits: u64,

    /// Total number of reads that found nothing
    pub misses: u64,

    /// Number of entries currently stored
    pub entries: usize,

    /// Entries dropped because they expired
    pub expirations: u64,

    /// Entries dropped by remove, prefix, tag or clear calls
    pub removals: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, expirations: {}, removals: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.expirations,
            self.removals
        )
    }
}

/// In-memory backend for buffers of type `B`
pub struct MemoryBackend<B> {
    tier: CacheTier,
    store: Arc<RwLock<MemoryStore<B>>>,
}

/// Internal storage
struct MemoryStore<B> {
    entries: HashMap<CacheKey, CacheEntry<B>>,
    stats: CacheStats,
}

impl<B> MemoryStore<B> {
    /// Drop every entry matching `predicate`, returning how many went
    fn remove_where(&mut self, predicate: impl Fn(&CacheEntry<B>) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !predicate(entry));
        let removed = before - self.entries.len();

        self.stats.removals += removed as u64;
        self.stats.entries = self.entries.len();
        removed
    }
}

impl<B> Clone for MemoryBackend<B> {
    fn clone(&self) -> Self {
        Self {
            tier: self.tier.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<B> MemoryBackend<B> {
    /// Create an empty backend serving `tier`
    pub fn new(tier: CacheTier) -> Self {
        debug!(%tier, "Initializing memory cache backend");

        Self {
            tier,
            store: Arc::new(RwLock::new(MemoryStore {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            })),
        }
    }

    /// Get backend statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        store.stats.clone()
    }

    /// Get number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        store.entries.len()
    }

    /// Check if the backend is empty
    pub async fn is_empty(&self) -> bool {
        let store = self.store.read().await;
        store.entries.is_empty()
    }

    /// Remove all expired entries
    pub async fn cleanup_expired(&self) -> usize {
        let mut store = self.store.write().await;

        let before = store.entries.len();
        store.entries.retain(|_, entry| !entry.is_expired());
        let expired = before - store.entries.len();

        store.stats.expirations += expired as u64;
        store.stats.entries = store.entries.len();

        if expired > 0 {
            debug!(expired, "Cleaned up expired cache entries");
        }
        expired
    }
}

fn ensure_active(cancel: &CancellationToken, operation: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(CacheError::Cancelled { operation });
    }
    Ok(())
}

/// Match `key` against a glob `pattern` where `*` spans any run of characters
pub fn matches_pattern(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };

    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}

#[async_trait]
impl<B> CacheBackend<B> for MemoryBackend<B>
where
    B: Clone + Send + Sync + 'static,
{
    fn tier(&self) -> CacheTier {
        self.tier.clone()
    }

    async fn get(&self, key: &str, cancel: &CancellationToken) -> Result<Option<B>> {
        ensure_active(cancel, "get")?;
        let mut store = self.store.write().await;

        let expired = match store.entries.get(key).map(|entry| entry.is_expired()) {
            Some(expired) => expired,
            None => {
                debug!(key, "Cache miss");
                store.stats.misses += 1;
                return Ok(None);
            }
        };

        if expired {
            debug!(key, "Cache entry expired");
            store.entries.remove(key);
            store.stats.misses += 1;
            store.stats.expirations += 1;
            store.stats.entries = store.entries.len();
            return Ok(None);
        }

        let value = store.entries.get_mut(key).map(|entry| {
            entry.mark_accessed();
            entry.value.clone()
        });
        store.stats.hits += 1;

        debug!(key, "Cache hit");
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: B,
        expiration: &CacheExpiration,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel, "set")?;
        let entry = CacheEntry::new(key.to_string(), value, expiration, tags);

        let mut store = self.store.write().await;
        if store.entries.insert(key.to_string(), entry).is_some() {
            debug!(key, "Updated existing cache entry");
        } else {
            debug!(key, "Inserted new cache entry");
        }
        store.stats.entries = store.entries.len();

        Ok(())
    }

    async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        ensure_active(cancel, "remove")?;
        let mut store = self.store.write().await;

        if store.entries.remove(key).is_some() {
            store.stats.removals += 1;
            store.stats.entries = store.entries.len();
            debug!(key, "Removed cache entry");
        }
        Ok(())
    }

    async fn remove_by_prefix(&self, prefix: &str, cancel: &CancellationToken) -> Result<()> {
        ensure_active(cancel, "remove_by_prefix")?;
        let mut store = self.store.write().await;

        let removed = store.remove_where(|entry| entry.key.starts_with(prefix));
        debug!(prefix, removed, "Removed cache entries by prefix");
        Ok(())
    }

    async fn remove_by_tags(&self, tags: &[String], cancel: &CancellationToken) -> Result<()> {
        ensure_active(cancel, "remove_by_tags")?;
        let mut store = self.store.write().await;

        let removed = store.remove_where(|entry| entry.has_any_tag(tags));
        info!(?tags, removed, "Invalidated cache entries by tag");
        Ok(())
    }

    async fn clear(&self, cancel: &CancellationToken) -> Result<()> {
        ensure_active(cancel, "clear")?;
        let mut store = self.store.write().await;

        let count = store.remove_where(|_| true);
        info!(count, tier = %self.tier, "Cleared memory cache backend");
        Ok(())
    }

    async fn exists(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        ensure_active(cancel, "exists")?;
        let store = self.store.read().await;

        Ok(store
            .entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false))
    }

    async fn list_keys(
        &self,
        pattern: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        ensure_active(cancel, "list_keys")?;
        let store = self.store.read().await;

        let mut keys: Vec<String> = store
            .entries
            .values()
            .filter(|entry| !entry.is_expired())
            .filter(|entry| pattern.map_or(true, |p| matches_pattern(p, &entry.key)))
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::NativeValue;
    use std::time::Duration;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    async fn put(backend: &MemoryBackend<String>, key: &str, tag_values: &[&str]) {
        backend
            .set(
                key,
                format!("value-of-{}", key),
                &CacheExpiration::none(),
                &tags(tag_values),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        put(&backend, "key1", &[]).await;

        let value = backend.get("key1", &cancel).await.unwrap();
        assert_eq!(value, Some("value-of-key1".to_string()));

        let stats = backend.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let value = backend.get("nonexistent", &CancellationToken::new()).await.unwrap();
        assert_eq!(value, None);
        assert_eq!(backend.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_native_values_keep_identity() {
        let backend = MemoryBackend::<NativeValue>::new(CacheTier::Local);
        let cancel = CancellationToken::new();
        let original: NativeValue = Arc::new(42u64);

        backend
            .set("n", Arc::clone(&original), &CacheExpiration::none(), &[], &cancel)
            .await
            .unwrap();
        let stored = backend.get("n", &cancel).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&original, &stored));
        assert_eq!(stored.downcast_ref::<u64>(), Some(&42));
    }

    #[tokio::test]
    async fn test_absolute_expiration() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        backend
            .set(
                "key1",
                "value1".to_string(),
                &CacheExpiration::absolute_from_now(Duration::from_millis(100)),
                &[],
                &cancel,
            )
            .await
            .unwrap();

        assert!(backend.get("key1", &cancel).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!backend.exists("key1", &cancel).await.unwrap());
        assert!(backend.get("key1", &cancel).await.unwrap().is_none());
        assert_eq!(backend.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn test_remove_and_exists() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        put(&backend, "key1", &[]).await;

        assert!(backend.exists("key1", &cancel).await.unwrap());
        backend.remove("key1", &cancel).await.unwrap();
        assert!(!backend.exists("key1", &cancel).await.unwrap());

        // Removing a missing key is not an error
        backend.remove("key1", &cancel).await.unwrap();
        assert_eq!(backend.stats().await.removals, 1);
    }

    #[tokio::test]
    async fn test_remove_by_prefix() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        put(&backend, "user:1", &[]).await;
        put(&backend, "user:2", &[]).await;
        put(&backend, "order:1", &[]).await;

        backend.remove_by_prefix("user:", &cancel).await.unwrap();

        assert_eq!(backend.list_keys(None, &cancel).await.unwrap(), vec!["order:1"]);
    }

    #[tokio::test]
    async fn test_remove_by_tags() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        put(&backend, "a", &["users"]).await;
        put(&backend, "b", &["orders"]).await;
        put(&backend, "c", &["users", "eu"]).await;
        put(&backend, "d", &[]).await;

        backend
            .remove_by_tags(&tags(&["users", "missing"]), &cancel)
            .await
            .unwrap();

        assert_eq!(backend.list_keys(None, &cancel).await.unwrap(), vec!["b", "d"]);
        assert_eq!(backend.stats().await.removals, 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        put(&backend, "key1", &[]).await;
        put(&backend, "key2", &[]).await;

        backend.clear(&CancellationToken::new()).await.unwrap();

        assert_eq!(backend.len().await, 0);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_keys_with_pattern() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        put(&backend, "user:1:profile", &[]).await;
        put(&backend, "user:2:profile", &[]).await;
        put(&backend, "user:2:orders", &[]).await;

        let keys = backend.list_keys(Some("user:*:profile"), &cancel).await.unwrap();
        assert_eq!(keys, vec!["user:1:profile", "user:2:profile"]);

        let keys = backend.list_keys(Some("user:2:orders"), &cancel).await.unwrap();
        assert_eq!(keys, vec!["user:2:orders"]);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        let short = CacheExpiration::absolute_from_now(Duration::from_millis(50));

        backend.set("key1", "v".into(), &short, &[], &cancel).await.unwrap();
        backend.set("key2", "v".into(), &short, &[], &cancel).await.unwrap();
        put(&backend, "key3", &[]).await;

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(backend.cleanup_expired().await, 2);
        assert_eq!(backend.len().await, 1);
        assert_eq!(backend.stats().await.expirations, 2);
    }

    #[tokio::test]
    async fn test_cancelled_token_is_rejected() {
        let backend = MemoryBackend::<String>::new(CacheTier::Distributed);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = backend.get("key1", &cancel).await.unwrap_err();
        assert_eq!(err, CacheError::Cancelled { operation: "get" });
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("*", "anything"));
        assert!(matches_pattern("user:*", "user:1"));
        assert!(matches_pattern("*:profile", "user:1:profile"));
        assert!(matches_pattern("a*b*c", "axxbyyc"));
        assert!(!matches_pattern("a*b*c", "axxcyyb"));
        assert!(!matches_pattern("user:*", "order:1"));
        assert!(!matches_pattern("ab*ba", "aba"));
        assert!(matches_pattern("exact", "exact"));
        assert!(!matches_pattern("exact", "exactly"));
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.miss_rate(), 20.0);
        assert!(format!("{}", stats).contains("hits: 80"));

        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
