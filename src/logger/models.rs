use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access log entry representing a single proxied request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub method: String,
    pub target: String,
    /// Which path handled the request: tunnel, cache, console, blocked
    pub route: String,
    pub status_code: u16,
    pub duration_ms: i64,
    pub error_message: Option<String>,
}
