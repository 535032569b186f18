//! Record cleaning
//!
//! Typed raw/clean review records, the validating parse from worksheet rows,
//! and the cleaner that derives the record key every later stage keys on.

mod cleaner;
mod key;
mod models;

pub use cleaner::{clamp_rating, clean, clean_all, clean_text, CleanBatch};
pub use key::RecordKey;
pub use models::{columns, CleanRecord, RawRecord, STAGING_COLUMNS};
