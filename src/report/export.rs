//! Side artifacts of a report. They never feed back into the report values.

use super::models::Report;
use crate::annotation::Sentiment;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const CSV_HEADER: [&str; 4] = ["class_name", "sentiment", "count", "percentage"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-class breakdown, one line per class and sentiment.
pub fn write_csv<W: Write>(report: &Report, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for (class, distribution) in &report.by_class {
        for sentiment in Sentiment::ALL {
            let share = distribution.share(sentiment);
            let count = share.count.to_string();
            let percentage = format!("{:.2}", share.percentage);
            csv.write_record([
                class.as_str(),
                sentiment.as_str(),
                count.as_str(),
                percentage.as_str(),
            ])?;
        }
    }
    csv.flush().map_err(|e| ExportError::Csv(e.into()))?;
    Ok(())
}

pub fn export_csv(report: &Report, path: &Path) -> Result<(), ExportError> {
    write_csv(report, create(path)?)
}

pub fn export_json(report: &Report, path: &Path) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })
}
