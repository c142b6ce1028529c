use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{WicketError, WicketResult};

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listening address for the proxy
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Protocol label ("http" or "https"). The label names the traffic the
    /// proxy is deployed for; it never makes the proxy terminate TLS —
    /// tunneled bytes are always passed through opaque.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Path of the management console
    #[serde(default = "default_console_path")]
    pub console_path: String,
}

fn default_bind() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("static bind address")
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_console_path() -> String {
    "/console".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            protocol: default_protocol(),
            console_path: default_console_path(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration. An unknown protocol label refuses to
    /// start the process.
    pub fn validate(&self) -> WicketResult<()> {
        match self.protocol.as_str() {
            "http" | "https" => {}
            other => {
                return Err(WicketError::config(format!(
                    "protocol is invalid; must be \"http\" or \"https\", got {:?}",
                    other
                )))
            }
        }

        if !self.console_path.starts_with('/') {
            return Err(WicketError::config(format!(
                "console_path must start with '/', got {:?}",
                self.console_path
            )));
        }

        Ok(())
    }
}
