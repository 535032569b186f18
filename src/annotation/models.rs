//! Annotation records and their `processed` worksheet representation.

use crate::cleaning::RecordKey;
use crate::worksheet::Row;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub mod columns {
    pub const RECORD_KEY: &str = "record_key";
    pub const SENTIMENT: &str = "sentiment";
    pub const SUMMARY: &str = "summary";
    pub const STATUS: &str = "status";
    pub const ATTEMPTED_AT: &str = "attempted_at";
    pub const ACTION_NEEDED: &str = "action_needed";
    pub const ATTEMPTS: &str = "attempts";
    pub const ERROR: &str = "error";
}

/// Header order of the processed worksheet.
pub const PROCESSED_COLUMNS: [&str; 8] = [
    columns::RECORD_KEY,
    columns::SENTIMENT,
    columns::SUMMARY,
    columns::STATUS,
    columns::ATTEMPTED_AT,
    columns::ACTION_NEEDED,
    columns::ATTEMPTS,
    columns::ERROR,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }

    /// Map a model label onto the three-way vocabulary.
    ///
    /// Case, surrounding whitespace, punctuation and markup are ignored. The
    /// label must be exactly one vocabulary word, optionally followed by
    /// "sentiment". Anything else yields `None`, so "Not negative" or
    /// "Positive/Negative" is a failed classification rather than a guess.
    pub fn normalize(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    ' '
                }
            })
            .collect();
        let word = match cleaned.split_whitespace().collect::<Vec<_>>()[..] {
            [word] | [word, "sentiment"] => word,
            _ => return None,
        };
        Sentiment::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationStatus {
    Success,
    Failed,
}

impl AnnotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStatus::Success => "Success",
            AnnotationStatus::Failed => "Failed",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            v if v.eq_ignore_ascii_case("success") => Some(AnnotationStatus::Success),
            v if v.eq_ignore_ascii_case("failed") => Some(AnnotationStatus::Failed),
            _ => None,
        }
    }
}

/// Raw answer of the model collaborator. The sentiment label is kept as the
/// model wrote it; the engine normalizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVerdict {
    pub sentiment: String,
    pub summary: String,
}

/// Outcome of annotating one record. At most one per record key lives in
/// the processed worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub record_key: RecordKey,
    /// Always set for `Success`, always `None` for `Failed`.
    pub sentiment: Option<Sentiment>,
    pub summary: String,
    pub status: AnnotationStatus,
    pub attempted_at: DateTime<Utc>,
    pub attempts: u32,
    pub error: Option<String>,
}

impl Annotation {
    pub fn success(
        record_key: RecordKey,
        sentiment: Sentiment,
        summary: String,
        attempts: u32,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            record_key,
            sentiment: Some(sentiment),
            summary,
            status: AnnotationStatus::Success,
            attempted_at,
            attempts,
            error: None,
        }
    }

    pub fn failed(
        record_key: RecordKey,
        reason: String,
        attempts: u32,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            record_key,
            sentiment: None,
            summary: String::new(),
            status: AnnotationStatus::Failed,
            attempted_at,
            attempts,
            error: Some(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AnnotationStatus::Success
    }

    /// Negative reviews need follow-up. `None` when nothing was classified.
    pub fn action_needed(&self) -> Option<bool> {
        self.sentiment.map(|s| s == Sentiment::Negative)
    }

    pub fn to_row(&self) -> Row {
        let action_needed = match self.action_needed() {
            Some(true) => "Yes",
            Some(false) => "No",
            None => "",
        };
        Row::new()
            .with(columns::RECORD_KEY, self.record_key.as_str())
            .with(
                columns::SENTIMENT,
                self.sentiment.map(|s| s.as_str()).unwrap_or_default(),
            )
            .with(columns::SUMMARY, self.summary.as_str())
            .with(columns::STATUS, self.status.as_str())
            .with(columns::ATTEMPTED_AT, self.attempted_at.to_rfc3339())
            .with(columns::ACTION_NEEDED, action_needed)
            .with(columns::ATTEMPTS, self.attempts.to_string())
            .with(columns::ERROR, self.error.clone().unwrap_or_default())
    }

    /// Parse a processed row. Rows that cannot be trusted as a prior result
    /// are rejected with the reason, so the record is annotated again.
    pub fn from_row(row: &Row) -> Result<Self, String> {
        let record_key = row
            .get(columns::RECORD_KEY)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or("missing record_key")?;
        let status_cell = row.get(columns::STATUS).unwrap_or_default();
        let status = AnnotationStatus::parse(status_cell)
            .ok_or_else(|| format!("unknown status '{}'", status_cell))?;
        let attempted_at = row
            .get(columns::ATTEMPTED_AT)
            .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or("missing or invalid attempted_at")?;
        let attempts = row
            .get(columns::ATTEMPTS)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(1);
        let summary = row.get(columns::SUMMARY).unwrap_or_default().to_string();
        let error = row
            .get(columns::ERROR)
            .filter(|e| !e.trim().is_empty())
            .map(str::to_string);

        let sentiment = match status {
            AnnotationStatus::Success => {
                let label = row.get(columns::SENTIMENT).unwrap_or_default();
                Some(
                    Sentiment::normalize(label)
                        .ok_or_else(|| format!("invalid sentiment '{}'", label))?,
                )
            }
            AnnotationStatus::Failed => None,
        };

        Ok(Self {
            record_key: RecordKey::from(record_key),
            sentiment,
            summary,
            status,
            attempted_at,
            attempts,
            error,
        })
    }
}
