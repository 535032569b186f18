//! Worksheet store module
//!
//! Typed read/write/create/clear access to the named worksheets of a remote
//! spreadsheet. Backends are stacked: the Google Sheets transport at the
//! bottom, a store-boundary retry layer above it, and the protected-write
//! guard on top so that writes to protected worksheets never reach the wire.

mod error;
mod google_sheets;
mod guard;
mod memory;
mod models;
mod retry;
mod store;

pub use error::StoreError;
pub use google_sheets::{GoogleSheetsStore, TokenSource, SHEETS_API_BASE_URL};
pub use guard::GuardedStore;
pub use memory::MemoryWorksheetStore;
pub use models::{header_for, upsert_rows, Row, TableNames, WriteMode};
pub use retry::RetryingStore;
pub use store::WorksheetStore;
