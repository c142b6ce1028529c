use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CacheConfig;

/// Outcome of an insert-if-absent store attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The value was stored under a previously empty key
    Stored,
    /// An entry already existed and was left untouched
    AlreadyPresent,
    /// The cache is disabled; nothing was stored
    Disabled,
}

/// Concurrent URI-keyed store of serialized responses.
///
/// Handles are cheap clones sharing one map; readers run concurrently while
/// writers mutate other keys. A key maps to at most one entry at any
/// instant. The normal store path never clobbers an existing entry; only
/// [`ResponseCache::overwrite`], used by the revalidation path, replaces
/// one. Entries are retained unboundedly.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, Bytes>>>,
    metrics: Arc<RwLock<CacheMetrics>>,
    config: CacheConfig,
}

impl ResponseCache {
    /// Create a new response cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(RwLock::new(CacheMetrics::default())),
            config,
        }
    }

    /// Look up the serialized response for a request URI
    pub async fn lookup(&self, uri: &str) -> Option<Bytes> {
        if !self.config.enabled {
            return None;
        }

        let entries = self.entries.read().await;
        match entries.get(uri) {
            Some(bytes) => {
                self.record(|m| m.hits += 1).await;
                Some(bytes.clone())
            }
            None => {
                self.record(|m| m.misses += 1).await;
                None
            }
        }
    }

    /// Store a serialized response if the key is absent
    pub async fn insert(&self, uri: &str, bytes: Bytes) -> StoreOutcome {
        if !self.config.enabled {
            return StoreOutcome::Disabled;
        }

        let mut entries = self.entries.write().await;
        if entries.contains_key(uri) {
            debug!("cache entry for {} already present, left untouched", uri);
            return StoreOutcome::AlreadyPresent;
        }

        entries.insert(uri.to_string(), bytes);
        drop(entries);

        self.record(|m| m.stores += 1).await;
        debug!("stored cache entry for {}", uri);
        StoreOutcome::Stored
    }

    /// Replace the entry for a key unconditionally. Reserved for the
    /// revalidation path, which replaces a response found stale.
    pub async fn overwrite(&self, uri: &str, bytes: Bytes) {
        if !self.config.enabled {
            return;
        }

        let mut entries = self.entries.write().await;
        entries.insert(uri.to_string(), bytes);
        drop(entries);

        self.record(|m| m.overwrites += 1).await;
        debug!("overwrote cache entry for {}", uri);
    }

    /// Check whether a key currently has an entry
    pub async fn contains_key(&self, uri: &str) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.entries.read().await.contains_key(uri)
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let metrics = self.metrics.read().await;

        CacheStats {
            entry_count: entries.len(),
            hits: metrics.hits,
            misses: metrics.misses,
            stores: metrics.stores,
            overwrites: metrics.overwrites,
        }
    }

    async fn record<F: FnOnce(&mut CacheMetrics)>(&self, update: F) {
        if !self.config.metrics_enabled {
            return;
        }
        let mut metrics = self.metrics.write().await;
        update(&mut metrics);
    }
}

/// Cache counters
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub overwrites: u64,
}

/// Cache statistics snapshot
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: usize,
    /// Total lookup hits
    pub hits: u64,
    /// Total lookup misses
    pub misses: u64,
    /// Total insert-if-absent stores
    pub stores: u64,
    /// Total revalidation overwrites
    pub overwrites: u64,
}

impl CacheStats {
    /// Hit ratio as a percentage of all lookups
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            (self.hits as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}
