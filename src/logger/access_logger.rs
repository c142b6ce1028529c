use chrono::Utc;
use hyper::StatusCode;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::file_logger::FileLogger;
use super::models::AccessLog;
use crate::config::LoggingConfig;
use crate::error::WicketResult;

/// Access logger for proxied requests. Cheap to clone; disabled loggers do
/// nothing. Logging failures never affect request handling.
#[derive(Clone)]
pub struct AccessLogger {
    enabled: bool,
    retention_days: Option<u32>,
    file_logger: Option<Arc<FileLogger>>,
}

impl AccessLogger {
    /// Create an access logger from configuration
    pub fn new(config: LoggingConfig) -> Self {
        let file_logger = if config.enabled {
            config.file.clone().map(|file| Arc::new(FileLogger::new(file)))
        } else {
            None
        };

        Self {
            enabled: config.enabled,
            retention_days: config.retention_days,
            file_logger,
        }
    }

    /// Create the log directory and run one retention pass
    pub async fn initialize(&self) -> WicketResult<()> {
        if let Some(file_logger) = &self.file_logger {
            file_logger.initialize().await?;
            if let Some(days) = self.retention_days {
                file_logger.cleanup_old_files(days).await?;
            }
        }
        Ok(())
    }

    /// Record one handled request
    #[allow(clippy::too_many_arguments)]
    pub async fn log_request(
        &self,
        request_id: Uuid,
        client_ip: &str,
        method: &str,
        target: &str,
        route: &str,
        status: StatusCode,
        duration_ms: i64,
        error_message: Option<String>,
    ) {
        if !self.enabled {
            return;
        }

        let Some(file_logger) = &self.file_logger else {
            return;
        };

        let entry = AccessLog {
            id: request_id.to_string(),
            timestamp: Utc::now(),
            client_ip: client_ip.to_string(),
            method: method.to_string(),
            target: target.to_string(),
            route: route.to_string(),
            status_code: status.as_u16(),
            duration_ms,
            error_message,
        };

        if let Err(e) = file_logger.write_log(&entry).await {
            warn!("failed to write access log: {}", e);
        }
    }
}
