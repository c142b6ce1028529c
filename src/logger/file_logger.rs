use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use super::models::AccessLog;
use crate::config::FileConfig;
use crate::error::WicketResult;

/// File-based access logging implementation
pub struct FileLogger {
    config: FileConfig,
}

impl FileLogger {
    /// Create a new file logger with the given configuration
    pub fn new(config: FileConfig) -> Self {
        Self { config }
    }

    /// Initialize the logging directory
    pub async fn initialize(&self) -> WicketResult<()> {
        tokio::fs::create_dir_all(&self.config.directory).await?;
        info!("Access log directory created: {}", self.config.directory);
        Ok(())
    }

    /// Write an access log entry as one JSON line
    pub async fn write_log(&self, log_entry: &AccessLog) -> WicketResult<()> {
        let file_path = self.log_file_path();
        let log_line = serde_json::to_string(log_entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await?;

        file.write_all(log_line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        debug!("Access log written to {}", file_path);
        Ok(())
    }

    /// Log file path, date-stamped when rotation is enabled
    fn log_file_path(&self) -> String {
        let filename = if self.config.rotation {
            format!("access-{}.log", Utc::now().format("%Y-%m-%d"))
        } else {
            "access.log".to_string()
        };
        format!("{}/{}", self.config.directory, filename)
    }

    /// Clean up log files older than the retention window
    pub async fn cleanup_old_files(&self, retention_days: u32) -> WicketResult<()> {
        let cutoff_time = Utc::now() - chrono::Duration::days(retention_days as i64);
        let mut entries = tokio::fs::read_dir(&self.config.directory).await?;
        let mut deleted_count = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if chrono::DateTime::<Utc>::from(modified) < cutoff_time {
                match tokio::fs::remove_file(&path).await {
                    Ok(_) => {
                        debug!("Deleted old log file: {:?}", path);
                        deleted_count += 1;
                    }
                    Err(e) => error!("Failed to delete old log file {:?}: {}", path, e),
                }
            }
        }

        if deleted_count > 0 {
            info!(
                "Cleaned up {} old log files older than {} days",
                deleted_count, retention_days
            );
        }

        Ok(())
    }
}
