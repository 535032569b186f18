//! Annotation engine.
//!
//! ## Per run
//!
//! ```text
//! staging records ─┬─ key has a Success annotation ──> reused, no model call
//!                  └─ otherwise (absent / Failed) ───> pending
//! pending ─ chunks(batch_size) ─> annotate (bounded concurrency, rate ceiling)
//!                               ─> upsert batch into processed by record_key
//! ```
//!
//! Per-record failures are folded into the tally and persisted as `Failed`
//! rows; only store failures and cancellation end a run early. Batches
//! already upserted stay valid and are reused by the next run.

use super::analyzer::ReviewAnalyzer;
use super::models::{columns, Annotation, PROCESSED_COLUMNS};
use super::state::RecordState;
use super::throttle::{
    acquire, NoOpThrottler, RequestThrottler, SlidingWindowThrottler, ThrottlerConfig,
};
use crate::cleaning::{CleanRecord, RecordKey};
use crate::config::AnnotationSettings;
use crate::pipeline::PipelineError;
use crate::retry_policy::RetryPolicy;
use crate::worksheet::{Row, StoreError, WorksheetStore, WriteMode};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters of one annotation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationTally {
    /// Records skipped because a Success annotation already existed.
    pub reused: usize,
    /// Records that went through the model this run.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Model calls issued, retries included.
    pub model_calls: usize,
    pub batches: usize,
}

impl AnnotationTally {
    fn record(&mut self, annotation: &Annotation) {
        self.attempted += 1;
        self.model_calls += annotation.attempts as usize;
        if annotation.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationOutcome {
    /// One annotation per input record key, in input order: reused
    /// successes and this run's results.
    pub annotations: Vec<Annotation>,
    pub tally: AnnotationTally,
}

/// Parse the processed worksheet into annotations.
///
/// A missing worksheet yields an empty ledger. Rows that do not parse are
/// skipped with a warning, which makes their records pending again.
pub async fn load_annotations(
    store: &dyn WorksheetStore,
    table: &str,
) -> Result<Vec<Annotation>, StoreError> {
    let rows = match store.read_table(table).await {
        Ok(rows) => rows,
        Err(StoreError::TableNotFound(_)) => {
            info!(table, "No processed table yet, starting fresh");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut annotations = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        match Annotation::from_row(row) {
            Ok(annotation) => annotations.push(annotation),
            // +2: header line and 1-based sheet rows
            Err(reason) => warn!(table, row = index + 2, "Ignoring processed row: {}", reason),
        }
    }
    debug!("Loaded {} existing annotations", annotations.len());
    Ok(annotations)
}

pub struct AnnotationEngine {
    analyzer: Arc<dyn ReviewAnalyzer>,
    store: Arc<dyn WorksheetStore>,
    processed_table: String,
    batch_size: usize,
    concurrency: usize,
    policy: RetryPolicy,
    throttler: Arc<dyn RequestThrottler>,
}

impl AnnotationEngine {
    pub fn new(
        analyzer: Arc<dyn ReviewAnalyzer>,
        store: Arc<dyn WorksheetStore>,
        processed_table: impl Into<String>,
        settings: &AnnotationSettings,
    ) -> Self {
        let throttler: Arc<dyn RequestThrottler> = if settings.max_requests_per_minute == 0 {
            Arc::new(NoOpThrottler)
        } else {
            Arc::new(SlidingWindowThrottler::new(ThrottlerConfig::per_minute(
                settings.max_requests_per_minute,
            )))
        };
        let batch_size = settings.batch_size.max(1);
        Self {
            analyzer,
            store,
            processed_table: processed_table.into(),
            batch_size,
            concurrency: settings.concurrency.clamp(1, batch_size),
            policy: RetryPolicy::new(&settings.retry),
            throttler,
        }
    }

    pub fn with_throttler(mut self, throttler: Arc<dyn RequestThrottler>) -> Self {
        self.throttler = throttler;
        self
    }

    /// Read the processed worksheet. A missing worksheet is an empty ledger.
    pub async fn load_existing(&self) -> Result<Vec<Annotation>, StoreError> {
        load_annotations(self.store.as_ref(), &self.processed_table).await
    }

    pub async fn run(
        &self,
        records: &[CleanRecord],
        existing: &[Annotation],
        cancel: &CancellationToken,
    ) -> Result<AnnotationOutcome, PipelineError> {
        let done: HashMap<&RecordKey, &Annotation> = existing
            .iter()
            .filter(|a| a.is_success())
            .map(|a| (&a.record_key, a))
            .collect();

        let mut tally = AnnotationTally::default();
        let mut results: HashMap<RecordKey, Annotation> = HashMap::new();
        let mut queued: HashSet<&RecordKey> = HashSet::new();
        let mut pending: Vec<&CleanRecord> = Vec::new();
        for record in records {
            if let Some(annotation) = done.get(&record.record_key) {
                results.insert(record.record_key.clone(), (*annotation).clone());
                tally.reused += 1;
            } else if queued.insert(&record.record_key) {
                pending.push(record);
            }
        }

        info!(
            "Annotation: {} already annotated, {} pending, batch size {}",
            tally.reused,
            pending.len(),
            self.batch_size
        );

        for (batch_index, batch) in pending.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    "Annotation cancelled after {} batches, {} records left pending",
                    batch_index,
                    pending.len() - batch_index * self.batch_size
                );
                return Err(PipelineError::Cancelled);
            }

            let annotations: Vec<Annotation> = stream::iter(batch.iter().copied())
                .map(|record| self.annotate(record))
                .buffered(self.concurrency)
                .collect()
                .await;

            let rows: Vec<Row> = annotations.iter().map(Annotation::to_row).collect();
            self.store
                .write_table(
                    &self.processed_table,
                    &PROCESSED_COLUMNS,
                    &rows,
                    &WriteMode::upsert(columns::RECORD_KEY),
                )
                .await?;

            let mut batch_failed = 0;
            for annotation in annotations {
                tally.record(&annotation);
                if !annotation.is_success() {
                    batch_failed += 1;
                }
                results.insert(annotation.record_key.clone(), annotation);
            }
            tally.batches += 1;
            info!(
                batch = batch_index + 1,
                "Upserted {} annotations ({} failed)",
                batch.len(),
                batch_failed
            );
        }

        let annotations = records
            .iter()
            .filter_map(|r| results.remove(&r.record_key))
            .collect();

        Ok(AnnotationOutcome { annotations, tally })
    }

    async fn annotate(&self, record: &CleanRecord) -> Annotation {
        let key = &record.record_key;
        let mut state = RecordState::Pending.begin();

        while let RecordState::Attempting(attempt) = state {
            acquire(self.throttler.as_ref()).await;
            debug!(record_key = %key, attempt, "Requesting annotation");
            let outcome = self
                .analyzer
                .classify_and_summarize(&record.review_text)
                .await;
            if let Err(e) = &outcome {
                warn!(record_key = %key, attempt, "Model call failed: {}", e);
            }

            let (next, delay) = state.advance(outcome, &self.policy);
            if let Some(delay) = delay {
                debug!(
                    record_key = %key,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            state = next;
        }

        let attempted_at = Utc::now();
        match state {
            RecordState::Success {
                sentiment,
                summary,
                attempts,
            } => Annotation::success(key.clone(), sentiment, summary, attempts, attempted_at),
            RecordState::Failed { reason, attempts } => {
                warn!(record_key = %key, attempts, "Annotation failed: {}", reason);
                Annotation::failed(key.clone(), reason, attempts, attempted_at)
            }
            RecordState::Pending | RecordState::Attempting(_) => Annotation::failed(
                key.clone(),
                "Annotation did not complete".to_string(),
                0,
                attempted_at,
            ),
        }
    }
}
