//! Sentiment analytics over annotated reviews.

mod export;
mod generator;
mod models;

pub use export::{export_csv, export_json, write_csv, ExportError, CSV_HEADER};
pub use generator::generate;
pub use models::{
    round_percentage, Report, SentimentDistribution, SentimentShare, TopClass, TopClasses,
    UNKNOWN_CLASS,
};
