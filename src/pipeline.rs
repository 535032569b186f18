//! End-to-end run: ETL -> annotation -> report.

use crate::annotation::{load_annotations, AnnotationEngine, AnnotationTally, ReviewAnalyzer};
use crate::config::{AnnotationSettings, ReportSettings};
use crate::etl::EtlPipeline;
use crate::report::{self, ExportError, Report};
use crate::worksheet::{StoreError, TableNames, WorksheetStore};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run-level failures. Per-record annotation failures never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input table is missing. Raised before anything is written.
    #[error("Source table '{0}' does not exist")]
    SourceMissing(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Report export failed: {0}")]
    Export(#[from] ExportError),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub staged: usize,
    /// `None` when annotation was skipped.
    pub annotation: Option<AnnotationTally>,
    pub report: Report,
    pub exported: Vec<PathBuf>,
}

impl RunSummary {
    pub fn log(&self) {
        info!("Records staged: {}", self.staged);
        match &self.annotation {
            Some(tally) => info!(
                "Annotations: {} reused, {} attempted, {} succeeded, {} failed ({} model calls)",
                tally.reused, tally.attempted, tally.succeeded, tally.failed, tally.model_calls
            ),
            None => info!("Annotation skipped"),
        }

        let overall = &self.report.overall;
        info!(
            "Overall sentiment over {} annotated reviews: {:.2}% positive, {:.2}% negative, {:.2}% neutral",
            overall.total,
            overall.positive.percentage,
            overall.negative.percentage,
            overall.neutral.percentage
        );
        if self.report.failed > 0 || self.report.unannotated > 0 {
            info!(
                "Excluded from report: {} failed, {} not annotated",
                self.report.failed, self.report.unannotated
            );
        }
        for (label, top) in [
            ("positive", &self.report.top_classes.highest_positive),
            ("negative", &self.report.top_classes.highest_negative),
            ("neutral", &self.report.top_classes.highest_neutral),
        ] {
            info!(
                "Most {} class: {} ({:.2}%)",
                label,
                top.class_name.as_deref().unwrap_or("None"),
                top.percentage
            );
        }
        for path in &self.exported {
            info!("Report written to {}", path.display());
        }
    }
}

/// One pipeline run, wired with explicit collaborators.
pub struct Pipeline {
    store: Arc<dyn WorksheetStore>,
    tables: TableNames,
    /// `None` runs ETL and the report over the existing ledger only.
    analyzer: Option<Arc<dyn ReviewAnalyzer>>,
    annotation: AnnotationSettings,
    report: ReportSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn WorksheetStore>,
        tables: TableNames,
        analyzer: Option<Arc<dyn ReviewAnalyzer>>,
        annotation: AnnotationSettings,
        report: ReportSettings,
    ) -> Self {
        Self {
            store,
            tables,
            analyzer,
            annotation,
            report,
        }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, PipelineError> {
        info!("Stage 1/3: extract and clean");
        let etl = EtlPipeline::new(self.store.clone(), self.tables.clone());
        let records = etl.run().await?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        info!("Stage 2/3: annotate");
        let existing = load_annotations(self.store.as_ref(), &self.tables.processed).await?;
        let (annotations, tally) = match &self.analyzer {
            Some(analyzer) => {
                let engine = AnnotationEngine::new(
                    analyzer.clone(),
                    self.store.clone(),
                    self.tables.processed.clone(),
                    &self.annotation,
                );
                let outcome = engine.run(&records, &existing, cancel).await?;
                (outcome.annotations, Some(outcome.tally))
            }
            None => (existing, None),
        };

        info!("Stage 3/3: report");
        let report = report::generate(&annotations, &records);
        let mut exported = Vec::new();
        report::export_csv(&report, &self.report.csv_path)?;
        exported.push(self.report.csv_path.clone());
        if let Some(json_path) = &self.report.json_path {
            report::export_json(&report, json_path)?;
            exported.push(json_path.clone());
        }

        let summary = RunSummary {
            staged: records.len(),
            annotation: tally,
            report,
            exported,
        };
        summary.log();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{MockReviewAnalyzer, ModelError, ModelVerdict};
    use crate::cleaning::columns;
    use crate::config::RetrySettings;
    use crate::worksheet::{GuardedStore, MemoryWorksheetStore, Row};

    fn raw_row(id: &str, text: &str, class: &str) -> Row {
        Row::new()
            .with(columns::ITEM_ID, id)
            .with(columns::TITLE, "")
            .with(columns::REVIEW_TEXT, text)
            .with(columns::RATING, "4")
            .with(columns::CLASS_NAME, class)
    }

    fn settings() -> AnnotationSettings {
        AnnotationSettings {
            batch_size: 2,
            concurrency: 2,
            max_requests_per_minute: 0,
            retry: RetrySettings {
                max_retries: 1,
                backoff_base_ms: 1,
                backoff_cap_ms: 1,
            },
        }
    }

    async fn seeded_store() -> (Arc<MemoryWorksheetStore>, Arc<dyn WorksheetStore>) {
        let memory = Arc::new(MemoryWorksheetStore::new());
        memory
            .seed_table(
                "raw_data",
                vec![
                    raw_row("1", "love it", "Knits"),
                    raw_row("2", "hate it", "Knits"),
                    raw_row("3", "it is fine", "Pants"),
                ],
            )
            .await;
        memory.protect("raw_data").await;
        let store: Arc<dyn WorksheetStore> =
            Arc::new(GuardedStore::new(memory.clone(), ["raw_data"]));
        (memory, store)
    }

    fn sentiment_for(text: &str) -> Result<ModelVerdict, ModelError> {
        let sentiment = match text {
            "love it" => "Positive",
            "hate it" => "Negative",
            _ => "Neutral",
        };
        Ok(ModelVerdict {
            sentiment: sentiment.to_string(),
            summary: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_full_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let (memory, store) = seeded_store().await;
        let mut analyzer = MockReviewAnalyzer::new();
        analyzer
            .expect_classify_and_summarize()
            .times(3)
            .returning(sentiment_for);
        let report_settings = ReportSettings {
            csv_path: dir.path().join("report.csv"),
            json_path: Some(dir.path().join("report.json")),
        };

        let pipeline = Pipeline::new(
            store,
            TableNames::default(),
            Some(Arc::new(analyzer)),
            settings(),
            report_settings.clone(),
        );
        let summary = pipeline.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.staged, 3);
        assert_eq!(summary.annotation.unwrap().succeeded, 3);
        assert_eq!(summary.report.by_class["Knits"].positive.percentage, 50.0);
        assert_eq!(summary.report.by_class["Pants"].neutral.count, 1);
        assert_eq!(summary.exported.len(), 2);
        assert!(report_settings.csv_path.exists());
        assert_eq!(memory.read_table("processed").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_skip_annotation_reports_existing_ledger() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_, store) = seeded_store().await;

        let pipeline = Pipeline::new(
            store,
            TableNames::default(),
            None,
            settings(),
            ReportSettings {
                csv_path: dir.path().join("report.csv"),
                json_path: None,
            },
        );
        let summary = pipeline.run(&CancellationToken::new()).await.unwrap();

        assert!(summary.annotation.is_none());
        assert_eq!(summary.report.unannotated, 3);
        assert_eq!(summary.report.annotated, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_annotation() {
        let dir = tempfile::TempDir::new().unwrap();
        let (memory, store) = seeded_store().await;
        let mut analyzer = MockReviewAnalyzer::new();
        analyzer.expect_classify_and_summarize().never();

        let pipeline = Pipeline::new(
            store,
            TableNames::default(),
            Some(Arc::new(analyzer)),
            settings(),
            ReportSettings {
                csv_path: dir.path().join("report.csv"),
                json_path: None,
            },
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline.run(&cancel).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(memory.write_count("processed").await, 0);
    }

    #[test]
    fn test_is_retryable() {
        assert!(PipelineError::Store(StoreError::Unavailable("503".into())).is_retryable());
        assert!(!PipelineError::SourceMissing("raw_data".into()).is_retryable());
        assert!(!PipelineError::Cancelled.is_retryable());
    }
}
