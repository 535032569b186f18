use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use review_insights::annotation::ReviewAnalyzer;
use review_insights::config::{self, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, DEFAULT_REPORT_CSV};
use review_insights::llm::{LlmReviewAnalyzer, OpenAIProvider};
use review_insights::retry_policy::RetryPolicy;
use review_insights::worksheet::{
    GoogleSheetsStore, GuardedStore, RetryingStore, WorksheetStore,
};
use review_insights::Pipeline;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(about = "Clean, annotate and report on customer reviews stored in Google Sheets")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Id of the spreadsheet holding the raw, staging and processed worksheets.
    #[clap(long, env = "GOOGLE_SHEET_ID")]
    pub sheet_id: Option<String>,

    /// OAuth access token for the Sheets API.
    #[clap(long, env = "GOOGLE_SHEETS_TOKEN", hide_env_values = true)]
    pub sheets_token: Option<String>,

    /// Shell command printing a fresh Sheets access token,
    /// e.g. `gcloud auth print-access-token`.
    #[clap(long, env = "GOOGLE_SHEETS_TOKEN_COMMAND")]
    pub sheets_token_command: Option<String>,

    /// API key of the OpenAI-compatible model endpoint.
    #[clap(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[clap(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    pub llm_base_url: String,

    #[clap(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,

    /// Records annotated per batch. Each batch is persisted before the next starts.
    #[clap(long, env = "BATCH_SIZE", default_value_t = 10)]
    pub batch_size: usize,

    /// Model calls in flight at once (clamped to the batch size).
    #[clap(long, env = "ANNOTATION_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Retries after the first model call for a transient failure.
    #[clap(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    #[clap(long, env = "BACKOFF_BASE_MS", default_value_t = 1000)]
    pub backoff_base_ms: u64,

    #[clap(long, env = "BACKOFF_CAP_MS", default_value_t = 30_000)]
    pub backoff_cap_ms: u64,

    /// Ceiling on model requests per minute. Set to 0 to disable.
    #[clap(long, env = "MAX_REQUESTS_PER_MINUTE", default_value_t = 30)]
    pub max_requests_per_minute: u32,

    /// Where to write the per-class CSV breakdown.
    #[clap(long, default_value = DEFAULT_REPORT_CSV)]
    pub report_csv: PathBuf,

    /// Also write the full report as JSON.
    #[clap(long)]
    pub report_json: Option<PathBuf>,

    /// Run ETL and the report only, over the existing processed worksheet.
    #[clap(long)]
    pub skip_annotation: bool,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            sheet_id: args.sheet_id.clone(),
            sheets_token: args.sheets_token.clone(),
            sheets_token_command: args.sheets_token_command.clone(),
            llm_api_key: args.llm_api_key.clone(),
            llm_base_url: args.llm_base_url.clone(),
            llm_model: args.llm_model.clone(),
            batch_size: args.batch_size,
            concurrency: args.concurrency,
            max_retries: args.max_retries,
            backoff_base_ms: args.backoff_base_ms,
            backoff_cap_ms: args.backoff_cap_ms,
            max_requests_per_minute: args.max_requests_per_minute,
            report_csv: args.report_csv.clone(),
            report_json: args.report_json.clone(),
            skip_annotation: args.skip_annotation,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine, the variables may come from the environment.
    dotenvy::dotenv().ok();
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  sheet_id: {}", app_config.sheet_id);
    info!("  tables: {:?}", app_config.tables);
    info!("  annotation: {:?}", app_config.annotation);
    info!("  report: {:?}", app_config.report);

    let sheets: Arc<dyn WorksheetStore> = Arc::new(GoogleSheetsStore::new(
        app_config.sheet_id.clone(),
        app_config.sheets_token.clone(),
    ));
    let retrying: Arc<dyn WorksheetStore> = Arc::new(RetryingStore::new(
        sheets,
        RetryPolicy::new(&app_config.annotation.retry),
    ));
    let store: Arc<dyn WorksheetStore> =
        Arc::new(GuardedStore::new(retrying, [app_config.tables.raw.clone()]));

    let analyzer: Option<Arc<dyn ReviewAnalyzer>> = match &app_config.llm {
        Some(llm) if !app_config.skip_annotation => {
            info!("Annotating with {} at {}", llm.model, llm.base_url);
            let provider = OpenAIProvider::new(
                llm.base_url.clone(),
                llm.model.clone(),
                llm.api_key.clone(),
            );
            Some(Arc::new(LlmReviewAnalyzer::new(Arc::new(provider))) as Arc<dyn ReviewAnalyzer>)
        }
        _ => {
            info!("Annotation disabled, reporting over the existing processed worksheet");
            None
        }
    };

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping after the current batch");
            signal_token.cancel();
        }
    });

    let pipeline = Pipeline::new(
        store,
        app_config.tables.clone(),
        analyzer,
        app_config.annotation.clone(),
        app_config.report.clone(),
    );
    match pipeline.run(&shutdown_token).await {
        Ok(_) => {
            info!("Run complete");
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(e).context("Pipeline run failed")
        }
    }
}
