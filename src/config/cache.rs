use serde::{Deserialize, Serialize};

/// Cache configuration
///
/// The cache is intentionally unbounded: there is no size accounting and no
/// eviction. Entries only ever change through the revalidation overwrite.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Enable/disable response caching
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Enable hit/miss/store counters
    #[serde(default = "default_enabled")]
    pub metrics_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_enabled: true,
        }
    }
}
