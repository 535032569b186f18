//! Protected-write guard.
//!
//! Wraps a store and rejects every mutating call that targets a worksheet
//! known to be protected, before the call reaches the transport.

use super::error::StoreError;
use super::models::{Row, WriteMode};
use super::store::WorksheetStore;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;

pub struct GuardedStore {
    inner: Arc<dyn WorksheetStore>,
    protected: HashSet<String>,
}

impl GuardedStore {
    pub fn new<I, S>(inner: Arc<dyn WorksheetStore>, protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            protected: protected.into_iter().map(Into::into).collect(),
        }
    }

    fn check_writable(&self, name: &str) -> Result<(), StoreError> {
        if self.protected.contains(name) {
            error!(table = name, "Blocked write to protected worksheet");
            return Err(StoreError::ProtectedTableWriteRejected(name.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WorksheetStore for GuardedStore {
    async fn read_table(&self, name: &str) -> Result<Vec<Row>, StoreError> {
        self.inner.read_table(name).await
    }

    async fn write_table(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[Row],
        mode: &WriteMode,
    ) -> Result<(), StoreError> {
        self.check_writable(name)?;
        self.inner.write_table(name, columns, rows, mode).await
    }

    async fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.table_exists(name).await
    }

    /// Reports the store's own protection, not the guard list.
    async fn is_protected(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.is_protected(name).await
    }

    async fn create_table(&self, name: &str) -> Result<(), StoreError> {
        self.check_writable(name)?;
        self.inner.create_table(name).await
    }

    async fn clear_table(&self, name: &str) -> Result<(), StoreError> {
        self.check_writable(name)?;
        self.inner.clear_table(name).await
    }
}
