//! Worksheet store trait definition.

use super::error::StoreError;
use super::models::{Row, WriteMode};
use async_trait::async_trait;

/// Typed access to the named worksheets of one spreadsheet.
///
/// Implementations carry no business logic: they move rows in and out of the
/// remote store and report failures using the [`StoreError`] taxonomy.
#[async_trait]
pub trait WorksheetStore: Send + Sync {
    /// Read every data row of a worksheet, in sheet order.
    ///
    /// Fails with `TableNotFound` if the worksheet does not exist.
    async fn read_table(&self, name: &str) -> Result<Vec<Row>, StoreError>;

    /// Write rows to a worksheet.
    ///
    /// `columns` is the header order to use; extra columns present on the
    /// rows are appended after it. A missing worksheet is created first.
    async fn write_table(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[Row],
        mode: &WriteMode,
    ) -> Result<(), StoreError>;

    async fn table_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Whether the worksheet carries edit protection in the remote store.
    async fn is_protected(&self, name: &str) -> Result<bool, StoreError>;

    /// Create an empty worksheet. Creating an existing worksheet is a no-op.
    async fn create_table(&self, name: &str) -> Result<(), StoreError>;

    /// Remove every cell of a worksheet, keeping the worksheet itself.
    async fn clear_table(&self, name: &str) -> Result<(), StoreError>;
}
