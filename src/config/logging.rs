use serde::{Deserialize, Serialize};

/// Access logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub file: Option<FileConfig>,
    pub retention_days: Option<u32>,
}

/// File logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileConfig {
    pub directory: String,
    pub rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: Some(FileConfig {
                directory: "logs".to_string(),
                rotation: true,
            }),
            retention_days: Some(30),
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enabled && self.file.is_none() {
            return Err(anyhow::anyhow!(
                "File configuration required when access logging is enabled"
            ));
        }

        if let Some(file) = &self.file {
            if file.directory.is_empty() {
                return Err(anyhow::anyhow!("Log directory cannot be empty"));
            }
        }

        Ok(())
    }
}
