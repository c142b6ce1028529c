use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Block-list configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockListConfig {
    /// Path of the newline-delimited block-list file. The file is read in
    /// full on every membership check and appended to (never rewritten)
    /// when a new entry is submitted.
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

fn default_path() -> PathBuf {
    PathBuf::from("tmp/block")
}

impl Default for BlockListConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}
