//! In-memory worksheet store.
//!
//! Behaves like a spreadsheet for the purposes of the pipeline: worksheets
//! can be protected, missing worksheets fail reads with `TableNotFound`, and
//! transient outages can be injected. Used by tests and by library callers
//! that want to run the pipeline without a remote spreadsheet.

use super::error::StoreError;
use super::models::{header_for, upsert_rows, Row, WriteMode};
use super::store::WorksheetStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone)]
struct MemoryTable {
    header: Vec<String>,
    rows: Vec<Row>,
    writes: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, MemoryTable>,
    protected: HashSet<String>,
    pending_outages: u32,
    calls: usize,
}

#[derive(Debug, Default)]
pub struct MemoryWorksheetStore {
    state: Mutex<MemoryState>,
}

impl MemoryWorksheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or overwrite) a worksheet with the given rows, bypassing
    /// protection. Header order follows the first row.
    pub async fn seed_table(&self, name: &str, rows: Vec<Row>) {
        let header = header_for(&[], &rows);
        let mut state = self.state.lock().await;
        state.tables.insert(
            name.to_string(),
            MemoryTable {
                header,
                rows,
                writes: 0,
            },
        );
    }

    /// Mark a worksheet as protected in the store itself.
    pub async fn protect(&self, name: &str) {
        self.state.lock().await.protected.insert(name.to_string());
    }

    /// Make the next `count` calls fail with `Unavailable`.
    pub async fn fail_next(&self, count: u32) {
        self.state.lock().await.pending_outages = count;
    }

    /// Number of successful writes (including clears) to a worksheet.
    pub async fn write_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .await
            .tables
            .get(name)
            .map(|t| t.writes)
            .unwrap_or(0)
    }

    /// Total number of calls that reached this store.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls
    }

    /// Header of a worksheet as it would appear in the sheet.
    pub async fn header(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .await
            .tables
            .get(name)
            .map(|t| t.header.clone())
    }

    fn enter(state: &mut MemoryState) -> Result<(), StoreError> {
        state.calls += 1;
        if state.pending_outages > 0 {
            state.pending_outages -= 1;
            return Err(StoreError::Unavailable(
                "injected outage (503 Service Unavailable)".to_string(),
            ));
        }
        Ok(())
    }

    fn check_writable(state: &MemoryState, name: &str) -> Result<(), StoreError> {
        if state.protected.contains(name) {
            return Err(StoreError::ProtectedTableWriteRejected(name.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WorksheetStore for MemoryWorksheetStore {
    async fn read_table(&self, name: &str) -> Result<Vec<Row>, StoreError> {
        let mut state = self.state.lock().await;
        Self::enter(&mut state)?;
        state
            .tables
            .get(name)
            .map(|t| t.rows.clone())
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    async fn write_table(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[Row],
        mode: &WriteMode,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        Self::enter(&mut state)?;
        Self::check_writable(&state, name)?;

        let table = state.tables.entry(name.to_string()).or_default();
        let merged = match mode {
            WriteMode::Replace => rows.to_vec(),
            WriteMode::Upsert { key_column } => {
                upsert_rows(std::mem::take(&mut table.rows), rows, key_column)
            }
        };
        table.header = header_for(columns, &merged);
        table.rows = merged;
        table.writes += 1;
        Ok(())
    }

    async fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Self::enter(&mut state)?;
        Ok(state.tables.contains_key(name))
    }

    async fn is_protected(&self, name: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Self::enter(&mut state)?;
        if !state.tables.contains_key(name) {
            return Err(StoreError::TableNotFound(name.to_string()));
        }
        Ok(state.protected.contains(name))
    }

    async fn create_table(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        Self::enter(&mut state)?;
        state.tables.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn clear_table(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        Self::enter(&mut state)?;
        Self::check_writable(&state, name)?;
        let table = state
            .tables
            .get_mut(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        table.header.clear();
        table.rows.clear();
        table.writes += 1;
        Ok(())
    }
}
