//! Review Insights Library
//!
//! Idempotent ETL and LLM annotation of customer reviews stored in a
//! spreadsheet, plus the sentiment report built on top of them.

pub mod annotation;
pub mod cleaning;
pub mod config;
pub mod etl;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod retry_policy;
pub mod worksheet;

// Re-export commonly used types for convenience
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use worksheet::{TableNames, WorksheetStore};
