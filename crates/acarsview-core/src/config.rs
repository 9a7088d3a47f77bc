use crate::constants::{
    DATA_DIR_NAME, DEFAULT_MAX_MESSAGES_PER_GROUP, DEFAULT_MAX_MESSAGE_GROUPS,
    DUPLICATE_WINDOW_SECS, MULTIPART_WINDOW_SECS,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration that can be loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Where persisted state (read message UIDs) lives
    pub data_dir: PathBuf,
    pub max_messages_per_group: usize,
    pub max_message_groups: usize,
    pub duplicate_window_secs: f64,
    pub multipart_window_secs: f64,
    /// Terms that flag a message as an alert
    pub alert_terms: Vec<String>,
    /// Terms that suppress an alert when present in the body
    pub ignore_terms: Vec<String>,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            max_messages_per_group: DEFAULT_MAX_MESSAGES_PER_GROUP,
            max_message_groups: DEFAULT_MAX_MESSAGE_GROUPS,
            duplicate_window_secs: DUPLICATE_WINDOW_SECS,
            multipart_window_secs: MULTIPART_WINDOW_SECS,
            alert_terms: Vec::new(),
            ignore_terms: Vec::new(),
        }
    }

    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CoreConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join(DATA_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME));
        Self::new(data_dir)
    }
}
