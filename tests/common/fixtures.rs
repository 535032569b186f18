//! Store fixtures and run helpers.

#![allow(dead_code)]

use super::constants::*;
use review_insights::annotation::ReviewAnalyzer;
use review_insights::cleaning::columns;
use review_insights::config::{AnnotationSettings, ReportSettings, RetrySettings};
use review_insights::worksheet::{GuardedStore, MemoryWorksheetStore, Row, WorksheetStore};
use review_insights::{Pipeline, PipelineError, RunSummary, TableNames};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// A raw row as it appears in the source worksheet.
pub fn raw_review(item_id: &str, review_text: &str, class_name: &str) -> Row {
    Row::new()
        .with(columns::ITEM_ID, item_id)
        .with(columns::AGE, "34")
        .with(columns::TITLE, format!("  Review   of {} ", item_id))
        .with(columns::REVIEW_TEXT, review_text)
        .with(columns::RATING, "5")
        .with(columns::RECOMMENDED, "1")
        .with(columns::POSITIVE_FEEDBACK_COUNT, "0")
        .with(columns::DIVISION, "General")
        .with(columns::DEPARTMENT, "Tops")
        .with(columns::CLASS_NAME, class_name)
}

/// A protected raw worksheet holding four reviews across two classes.
pub async fn seeded_store() -> Arc<MemoryWorksheetStore> {
    let store = Arc::new(MemoryWorksheetStore::new());
    store
        .seed_table(
            RAW_TABLE,
            vec![
                raw_review("1001", LOVE_TEXT, KNITS),
                raw_review("1002", HATE_TEXT, KNITS),
                raw_review("1003", MEH_TEXT, DRESSES),
                raw_review("1004", FLAKY_TEXT, DRESSES),
            ],
        )
        .await;
    store.protect(RAW_TABLE).await;
    store
}

/// Small batches and millisecond backoff so retries finish quickly.
pub fn quick_settings() -> AnnotationSettings {
    AnnotationSettings {
        batch_size: 2,
        concurrency: 2,
        max_requests_per_minute: 0,
        retry: RetrySettings {
            max_retries: 2,
            backoff_base_ms: 1,
            backoff_cap_ms: 4,
        },
    }
}

/// Wires a pipeline over a memory store the same way the binary does,
/// with the raw worksheet behind the write guard.
pub struct TestRun {
    pub memory: Arc<MemoryWorksheetStore>,
    pub output_dir: TempDir,
}

impl TestRun {
    pub fn new(memory: Arc<MemoryWorksheetStore>) -> Self {
        Self {
            memory,
            output_dir: TempDir::new().unwrap(),
        }
    }

    pub fn store(&self) -> Arc<dyn WorksheetStore> {
        Arc::new(GuardedStore::new(self.memory.clone(), [RAW_TABLE]))
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            csv_path: self.output_dir.path().join("report.csv"),
            json_path: Some(self.output_dir.path().join("report.json")),
        }
    }

    pub async fn run(
        &self,
        analyzer: Option<Arc<dyn ReviewAnalyzer>>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        Pipeline::new(
            self.store(),
            TableNames::default(),
            analyzer,
            quick_settings(),
            self.report_settings(),
        )
        .run(cancel)
        .await
    }
}
