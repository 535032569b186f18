use crate::cleaning::{clean_all, columns, CleanRecord, RawRecord, STAGING_COLUMNS};
use crate::pipeline::PipelineError;
use crate::worksheet::{Row, StoreError, TableNames, WorksheetStore, WriteMode};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Extract raw reviews, clean them and recreate the staging worksheet.
///
/// The raw worksheet is only ever read. Staging is rewritten in full on every
/// run, so an unchanged raw worksheet always yields the same staging content.
pub struct EtlPipeline {
    store: Arc<dyn WorksheetStore>,
    tables: TableNames,
}

impl EtlPipeline {
    pub fn new(store: Arc<dyn WorksheetStore>, tables: TableNames) -> Self {
        Self { store, tables }
    }

    pub async fn run(&self) -> Result<Vec<CleanRecord>, PipelineError> {
        let raw_rows = self.extract().await?;

        let raws: Vec<RawRecord> = raw_rows.iter().map(RawRecord::from_row).collect();
        let batch = clean_all(&raws);
        if batch.dropped_empty > 0 {
            info!("Dropped {} empty raw rows", batch.dropped_empty);
        }
        if batch.duplicates > 0 {
            warn!(
                "{} raw rows repeat an earlier review, keyed by occurrence",
                batch.duplicates
            );
        }

        let rows: Vec<Row> = batch.records.iter().map(CleanRecord::to_row).collect();
        self.store
            .write_table(
                &self.tables.staging,
                &STAGING_COLUMNS,
                &rows,
                &WriteMode::Replace,
            )
            .await?;

        info!(
            table = %self.tables.staging,
            "Staged {} records from {} raw rows",
            batch.records.len(),
            raw_rows.len()
        );
        Ok(batch.records)
    }

    /// Read the staging worksheet back, for running annotation on its own.
    pub async fn extract_staging(&self) -> Result<Vec<CleanRecord>, PipelineError> {
        let rows = match self.store.read_table(&self.tables.staging).await {
            Ok(rows) => rows,
            Err(StoreError::TableNotFound(name)) => {
                error!(table = %name, "Staging table missing, run the ETL stage first");
                return Err(PipelineError::SourceMissing(name));
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            match CleanRecord::from_row(row) {
                Some(record) => records.push(record),
                None if row.is_blank() => {}
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                table = %self.tables.staging,
                "Skipped {} staging rows without a {}",
                skipped,
                columns::RECORD_KEY
            );
        }
        debug!("Read {} records from staging", records.len());
        Ok(records)
    }

    async fn extract(&self) -> Result<Vec<Row>, PipelineError> {
        let raw = &self.tables.raw;
        let rows = match self.store.read_table(raw).await {
            Ok(rows) => rows,
            Err(StoreError::TableNotFound(name)) => {
                error!(table = %name, "Raw table does not exist, aborting before any write");
                return Err(PipelineError::SourceMissing(name));
            }
            Err(e) => return Err(e.into()),
        };

        if !self.store.is_protected(raw).await? {
            warn!(table = %raw, "Raw table is not protected in the spreadsheet");
        }
        info!(table = %raw, "Extracted {} raw rows", rows.len());
        Ok(rows)
    }
}
