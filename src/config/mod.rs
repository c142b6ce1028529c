//! Configuration for the wicket proxy.
//!
//! A single TOML file configures all subsystems: the listening server, the
//! persisted block list, the response cache, the upstream HTTP client pool
//! and the access log. Values support `${VAR}` / `${VAR:-default}`
//! environment expansion. Missing sections fall back to defaults; an invalid
//! protocol label is the one configuration error that refuses startup.

pub mod blocklist;
pub mod cache;
pub mod http_client;
pub mod logging;
pub mod server;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{info, warn};

use crate::error::WicketResult;

pub use blocklist::BlockListConfig;
pub use cache::CacheConfig;
pub use http_client::HttpClientConfig;
pub use logging::{FileConfig, LoggingConfig};
pub use server::ServerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Listening address, protocol label and console path
    #[serde(default)]
    pub server: ServerConfig,
    /// Persisted block-list store
    #[serde(default)]
    pub blocklist: BlockListConfig,
    /// Response cache switches
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upstream HTTP client pool tunables (optional)
    pub http_client: Option<HttpClientConfig>,
    /// Access log configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file with environment variable
    /// expansion
    pub async fn from_file<P: AsRef<Path>>(path: P) -> WicketResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await.map_err(|e| {
            crate::error::WicketError::config(format!(
                "cannot read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let expanded = expand_env_vars(&content);
        let mut config: Config = toml::from_str(&expanded)?;

        config.apply_defaults();
        config.validate()?;

        info!("Configuration loaded from {:?}", path.as_ref());
        Ok(config)
    }

    /// Apply default values where needed
    fn apply_defaults(&mut self) {
        if !self.cache.enabled {
            self.cache.metrics_enabled = false;
        }

        if self.logging.enabled && self.logging.file.is_none() {
            self.logging.file = Some(FileConfig {
                directory: "logs".to_string(),
                rotation: true,
            });
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> WicketResult<()> {
        self.server.validate()?;

        if let Some(http_client) = &self.http_client {
            http_client
                .validate()
                .map_err(|e| crate::error::WicketError::config(e.to_string()))?;
        }

        self.logging
            .validate()
            .map_err(|e| crate::error::WicketError::config(e.to_string()))?;

        if self.blocklist.path.as_os_str().is_empty() {
            return Err(crate::error::WicketError::config(
                "blocklist path cannot be empty",
            ));
        }

        Ok(())
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references in configuration content
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();

    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_expr = &result[start + 2..start + end];
            let replacement = if let Some(default_pos) = var_expr.find(":-") {
                let var_name = &var_expr[..default_pos];
                let default_value = &var_expr[default_pos + 2..];
                env::var(var_name).unwrap_or_else(|_| default_value.to_string())
            } else {
                env::var(var_expr).unwrap_or_else(|_| {
                    warn!(
                        "Environment variable '{}' not found, using empty string",
                        var_expr
                    );
                    String::new()
                })
            };
            result.replace_range(start..start + end + 1, &replacement);
        } else {
            break;
        }
    }

    result
}
