use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration. Credentials are deliberately absent: they
/// only come from flags or the environment.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub sheet_id: Option<String>,
    pub sheets_token_command: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub report_csv: Option<String>,
    pub report_json: Option<String>,
    pub skip_annotation: Option<bool>,

    pub tables: Option<TablesConfig>,
    pub annotation: Option<AnnotationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TablesConfig {
    pub raw: Option<String>,
    pub staging: Option<String>,
    pub processed: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AnnotationConfig {
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub backoff_cap_ms: Option<u64>,
    pub max_requests_per_minute: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
