//! Block-list enforcement.
//!
//! The list of blocked hosts/URLs lives in a newline-delimited plain-text
//! store that is read in full on every membership check, so an appended
//! entry takes effect on the very next check. The store sits behind the
//! [`BlockStore`] trait; production uses [`FileBlockStore`].

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::BlockListConfig;
use crate::error::{WicketError, WicketResult};

/// Persisted block-list store
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Read all entries, in stored order, skipping blank lines
    async fn read_entries(&self) -> WicketResult<Vec<String>>;

    /// Append one newline-terminated entry
    async fn append_entry(&self, entry: &str) -> WicketResult<()>;
}

/// File-backed block-list store
pub struct FileBlockStore {
    path: PathBuf,
}

impl FileBlockStore {
    /// Create a store over the configured file path
    pub fn new(config: &BlockListConfig) -> Self {
        Self {
            path: config.path.clone(),
        }
    }
}

#[async_trait]
impl BlockStore for FileBlockStore {
    async fn read_entries(&self) -> WicketResult<Vec<String>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            WicketError::persistence(format!("cannot open block list {:?}: {}", self.path, e))
        })?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn append_entry(&self, entry: &str) -> WicketResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    WicketError::persistence(format!(
                        "cannot create block list directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                WicketError::persistence(format!("cannot open block list {:?}: {}", self.path, e))
            })?;

        file.write_all(entry.as_bytes()).await.map_err(|e| {
            WicketError::persistence(format!("cannot write block list entry: {}", e))
        })?;
        file.write_all(b"\n").await.map_err(|e| {
            WicketError::persistence(format!("cannot write block list entry: {}", e))
        })?;
        file.flush()
            .await
            .map_err(|e| WicketError::persistence(format!("cannot flush block list: {}", e)))?;

        Ok(())
    }
}

/// Membership test and append over a persisted block list
#[derive(Clone)]
pub struct BlockListGuard {
    store: Arc<dyn BlockStore>,
}

impl BlockListGuard {
    /// Create a guard over an injected store
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self { store }
    }

    /// Check whether a candidate (CONNECT authority or full request URI) is
    /// blocked.
    ///
    /// Matching policy: substring containment. A candidate is blocked when
    /// any stored entry occurs anywhere inside it; the same rule applies to
    /// both paths. The list is read fresh on every call, so there is no
    /// staleness window. An unreadable store fails open: the candidate is
    /// treated as not blocked and a warning is logged.
    pub async fn is_blocked(&self, candidate: &str) -> bool {
        let entries = match self.store.read_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("block list unavailable, failing open: {}", e);
                return false;
            }
        };

        entries.iter().any(|entry| candidate.contains(entry.as_str()))
    }

    /// Append one entry to the list. A blank or whitespace-only submission
    /// is silently rejected; nothing is written and no error is surfaced.
    pub async fn append(&self, url: &str) -> WicketResult<()> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            debug!("ignoring blank block list submission");
            return Ok(());
        }

        self.store.append_entry(trimmed).await
    }

    /// Current entries, in stored order (for the management console)
    pub async fn entries(&self) -> WicketResult<Vec<String>> {
        self.store.read_entries().await
    }
}
