mod file_config;

pub use file_config::{AnnotationConfig, FileConfig, TablesConfig};

use crate::worksheet::{TableNames, TokenSource};
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_REPORT_CSV: &str = "sentiment_analysis_report.csv";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub sheet_id: Option<String>,
    pub sheets_token: Option<String>,
    pub sheets_token_command: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub max_requests_per_minute: u32,
    pub report_csv: PathBuf,
    pub report_json: Option<PathBuf>,
    pub skip_annotation: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let annotation = AnnotationSettings::default();
        Self {
            sheet_id: None,
            sheets_token: None,
            sheets_token_command: None,
            llm_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            batch_size: annotation.batch_size,
            concurrency: annotation.concurrency,
            max_retries: annotation.retry.max_retries,
            backoff_base_ms: annotation.retry.backoff_base_ms,
            backoff_cap_ms: annotation.retry.backoff_cap_ms,
            max_requests_per_minute: annotation.max_requests_per_minute,
            report_csv: PathBuf::from(DEFAULT_REPORT_CSV),
            report_json: None,
            skip_annotation: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sheet_id: String,
    pub sheets_token: TokenSource,
    /// `None` only when annotation is skipped.
    pub llm: Option<LlmSettings>,
    pub annotation: AnnotationSettings,
    pub tables: TableNames,
    pub report: ReportSettings,
    pub skip_annotation: bool,
}

#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            backoff_cap_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSettings {
    pub batch_size: usize,
    /// Model calls in flight at once, never more than `batch_size`.
    pub concurrency: usize,
    /// 0 disables the rate ceiling.
    pub max_requests_per_minute: u32,
    pub retry: RetrySettings,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            concurrency: 1,
            max_requests_per_minute: 30,
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub csv_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let sheet_id = file
            .sheet_id
            .or_else(|| cli.sheet_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "sheet_id must be specified via --sheet-id, GOOGLE_SHEET_ID or in config file"
                )
            })?;

        let token_command = file
            .sheets_token_command
            .or_else(|| cli.sheets_token_command.clone());
        let sheets_token = match (cli.sheets_token.clone(), token_command) {
            (Some(token), _) if !token.trim().is_empty() => TokenSource::Static(token),
            (_, Some(command)) if !command.trim().is_empty() => TokenSource::Command(command),
            _ => bail!(
                "A Sheets access token must be provided via --sheets-token or --sheets-token-command"
            ),
        };

        let skip_annotation = file.skip_annotation.unwrap_or(cli.skip_annotation);

        let llm = match cli.llm_api_key.clone().filter(|k| !k.trim().is_empty()) {
            Some(api_key) => Some(LlmSettings {
                api_key,
                base_url: file
                    .llm_base_url
                    .unwrap_or_else(|| cli.llm_base_url.clone()),
                model: file.llm_model.unwrap_or_else(|| cli.llm_model.clone()),
            }),
            None if skip_annotation => None,
            None => bail!("Model credential must be specified via --llm-api-key or GROQ_API_KEY"),
        };

        let ann = file.annotation.unwrap_or_default();
        let batch_size = ann.batch_size.unwrap_or(cli.batch_size);
        if batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        let retry = RetrySettings {
            max_retries: ann.max_retries.unwrap_or(cli.max_retries),
            backoff_base_ms: ann.backoff_base_ms.unwrap_or(cli.backoff_base_ms),
            backoff_cap_ms: ann.backoff_cap_ms.unwrap_or(cli.backoff_cap_ms),
        };
        if retry.backoff_cap_ms < retry.backoff_base_ms {
            bail!(
                "backoff cap ({} ms) must not be lower than backoff base ({} ms)",
                retry.backoff_cap_ms,
                retry.backoff_base_ms
            );
        }
        let annotation = AnnotationSettings {
            batch_size,
            concurrency: ann
                .concurrency
                .unwrap_or(cli.concurrency)
                .clamp(1, batch_size),
            max_requests_per_minute: ann
                .max_requests_per_minute
                .unwrap_or(cli.max_requests_per_minute),
            retry,
        };

        let defaults = TableNames::default();
        let tables_file = file.tables.unwrap_or_default();
        let tables = TableNames {
            raw: tables_file.raw.unwrap_or(defaults.raw),
            staging: tables_file.staging.unwrap_or(defaults.staging),
            processed: tables_file.processed.unwrap_or(defaults.processed),
        };
        if tables.raw == tables.staging || tables.raw == tables.processed {
            bail!("The raw table must not double as staging or processed");
        }
        if tables.staging == tables.processed {
            bail!("staging and processed must be different tables");
        }

        let report = ReportSettings {
            csv_path: file
                .report_csv
                .map(PathBuf::from)
                .unwrap_or_else(|| cli.report_csv.clone()),
            json_path: file
                .report_json
                .map(PathBuf::from)
                .or_else(|| cli.report_json.clone()),
        };

        Ok(Self {
            sheet_id,
            sheets_token,
            llm,
            annotation,
            tables,
            report,
            skip_annotation,
        })
    }
}
