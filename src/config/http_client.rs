use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration for upstream requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpClientConfig {
    pub pool_max_idle_per_host: Option<usize>,
    pub pool_idle_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: Some(32),
            pool_idle_timeout_secs: Some(90),
            request_timeout_secs: Some(60),
        }
    }
}

impl HttpClientConfig {
    /// Validate HTTP client configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(max_idle) = self.pool_max_idle_per_host {
            if max_idle == 0 {
                return Err(anyhow::anyhow!(
                    "HTTP client pool_max_idle_per_host must be greater than 0"
                ));
            }
        }

        if let Some(idle_timeout) = self.pool_idle_timeout_secs {
            if idle_timeout == 0 {
                return Err(anyhow::anyhow!(
                    "HTTP client pool_idle_timeout_secs must be greater than 0"
                ));
            }
        }

        if let Some(request_timeout) = self.request_timeout_secs {
            if request_timeout == 0 {
                return Err(anyhow::anyhow!(
                    "HTTP client request_timeout_secs must be greater than 0"
                ));
            }
        }

        Ok(())
    }

    /// Get pool max idle connections per host
    pub fn get_pool_max_idle_per_host(&self) -> usize {
        self.pool_max_idle_per_host.unwrap_or(32)
    }

    /// Get pool idle timeout
    pub fn get_pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs.unwrap_or(90))
    }

    /// Get request timeout
    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(60))
    }
}
