//! Review record models.
//!
//! `RawRecord` is the typed view of one `raw_data` row, parsed leniently at
//! the store boundary. `CleanRecord` is what the staging worksheet holds.

use super::key::RecordKey;
use crate::worksheet::Row;
use serde::Serialize;

/// Column headers of the source worksheet.
pub mod columns {
    pub const ITEM_ID: &str = "Clothing ID";
    pub const AGE: &str = "Age";
    pub const TITLE: &str = "Title";
    pub const REVIEW_TEXT: &str = "Review Text";
    pub const RATING: &str = "Rating";
    pub const RECOMMENDED: &str = "Recommended IND";
    pub const POSITIVE_FEEDBACK_COUNT: &str = "Positive Feedback Count";
    pub const DIVISION: &str = "Division Name";
    pub const DEPARTMENT: &str = "Department Name";
    pub const CLASS_NAME: &str = "Class Name";

    /// Added by the pipeline; first column of the staging worksheet.
    pub const RECORD_KEY: &str = "record_key";
}

/// Header order of the staging worksheet.
pub const STAGING_COLUMNS: [&str; 11] = [
    columns::RECORD_KEY,
    columns::ITEM_ID,
    columns::AGE,
    columns::TITLE,
    columns::REVIEW_TEXT,
    columns::RATING,
    columns::RECOMMENDED,
    columns::POSITIVE_FEEDBACK_COUNT,
    columns::DIVISION,
    columns::DEPARTMENT,
    columns::CLASS_NAME,
];

/// One source row as found in the raw worksheet.
///
/// Every field is optional: the worksheet is human-edited and cells may be
/// blank or hold values of the wrong type. Values that cannot be parsed are
/// read as `None` and resolved by the cleaner's fallback policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub item_id: Option<String>,
    pub age: Option<i64>,
    pub title: Option<String>,
    pub review_text: Option<String>,
    pub rating: Option<i64>,
    pub recommended: Option<bool>,
    pub positive_feedback_count: Option<i64>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub class_name: Option<String>,
}

impl RawRecord {
    pub fn from_row(row: &Row) -> Self {
        Self {
            item_id: parse_text(row.get(columns::ITEM_ID)),
            age: parse_integer(row.get(columns::AGE)),
            title: parse_text(row.get(columns::TITLE)),
            review_text: parse_text(row.get(columns::REVIEW_TEXT)),
            rating: parse_integer(row.get(columns::RATING)),
            recommended: parse_flag(row.get(columns::RECOMMENDED)),
            positive_feedback_count: parse_integer(row.get(columns::POSITIVE_FEEDBACK_COUNT)),
            division: parse_text(row.get(columns::DIVISION)),
            department: parse_text(row.get(columns::DEPARTMENT)),
            class_name: parse_text(row.get(columns::CLASS_NAME)),
        }
    }

    /// True when the source row carried no usable value at all.
    pub fn is_empty(&self) -> bool {
        *self == RawRecord::default()
    }
}

/// A cleaned review, one per kept raw row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanRecord {
    pub record_key: RecordKey,
    pub item_id: String,
    pub age: Option<u32>,
    pub title: String,
    pub review_text: String,
    /// Always within 1..=5 when present. A missing or non-numeric rating
    /// stays `None` and is staged as an empty cell rather than a guessed
    /// value.
    pub rating: Option<u8>,
    pub recommended: bool,
    pub positive_feedback_count: u32,
    pub division: String,
    pub department: String,
    pub class_name: String,
}

impl CleanRecord {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with(columns::RECORD_KEY, self.record_key.as_str())
            .with(columns::ITEM_ID, self.item_id.as_str())
            .with(
                columns::AGE,
                self.age.map(|a| a.to_string()).unwrap_or_default(),
            )
            .with(columns::TITLE, self.title.as_str())
            .with(columns::REVIEW_TEXT, self.review_text.as_str())
            .with(
                columns::RATING,
                self.rating.map(|r| r.to_string()).unwrap_or_default(),
            )
            .with(columns::RECOMMENDED, if self.recommended { "1" } else { "0" })
            .with(
                columns::POSITIVE_FEEDBACK_COUNT,
                self.positive_feedback_count.to_string(),
            )
            .with(columns::DIVISION, self.division.as_str())
            .with(columns::DEPARTMENT, self.department.as_str())
            .with(columns::CLASS_NAME, self.class_name.as_str())
    }

    /// Parse a staging row. The stored record key is kept as-is; every other
    /// field goes through the cleaner again, so hand edits to staging are
    /// normalized. Returns `None` for rows without a record key.
    pub fn from_row(row: &Row) -> Option<Self> {
        let key = row.get(columns::RECORD_KEY)?.trim();
        if key.is_empty() {
            return None;
        }
        let raw = RawRecord::from_row(row);
        Some(super::cleaner::clean_with_key(&raw, RecordKey::from(key)))
    }
}

fn parse_text(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Accepts plain integers and the float renderings spreadsheets produce
/// (`"4.0"`). Fractions are rounded.
fn parse_integer(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.round() as i64)
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row() -> Row {
        Row::new()
            .with(columns::ITEM_ID, "1077")
            .with(columns::AGE, "60")
            .with(columns::TITLE, "Some major design flaws")
            .with(columns::REVIEW_TEXT, "I had such high hopes for this dress")
            .with(columns::RATING, "3")
            .with(columns::RECOMMENDED, "0")
            .with(columns::POSITIVE_FEEDBACK_COUNT, "0")
            .with(columns::DIVISION, "General")
            .with(columns::DEPARTMENT, "Dresses")
            .with(columns::CLASS_NAME, "Dresses")
    }

    #[test]
    fn test_raw_from_row() {
        let raw = RawRecord::from_row(&full_row());
        assert_eq!(raw.item_id.as_deref(), Some("1077"));
        assert_eq!(raw.age, Some(60));
        assert_eq!(raw.rating, Some(3));
        assert_eq!(raw.recommended, Some(false));
        assert_eq!(raw.class_name.as_deref(), Some("Dresses"));
    }

    #[test]
    fn test_raw_from_row_is_lenient() {
        let row = Row::new()
            .with(columns::RATING, "4.0")
            .with(columns::AGE, "unknown")
            .with(columns::RECOMMENDED, "maybe")
            .with(columns::TITLE, "   ");
        let raw = RawRecord::from_row(&row);

        assert_eq!(raw.rating, Some(4));
        assert_eq!(raw.age, None);
        assert_eq!(raw.recommended, None);
        assert_eq!(raw.title, None);
        assert_eq!(raw.review_text, None);
    }

    #[test]
    fn test_empty_raw_record() {
        assert!(RawRecord::from_row(&Row::new().with(columns::TITLE, "")).is_empty());
        assert!(!RawRecord::from_row(&full_row()).is_empty());
    }

    #[test]
    fn test_clean_record_row_round_trip() {
        let raw = RawRecord::from_row(&full_row());
        let clean = crate::cleaning::clean(&raw);

        let row = clean.to_row();
        assert_eq!(row.columns().collect::<Vec<_>>(), STAGING_COLUMNS.to_vec());
        assert_eq!(CleanRecord::from_row(&row), Some(clean));
    }

    #[test]
    fn test_missing_rating_is_staged_empty() {
        let mut row = full_row();
        row.insert(columns::RATING, "n/a");
        let clean = crate::cleaning::clean(&RawRecord::from_row(&row));

        assert_eq!(clean.rating, None);
        let staged = clean.to_row();
        assert_eq!(staged.get(columns::RATING), Some(""));
        assert_eq!(CleanRecord::from_row(&staged).unwrap().rating, None);
    }

    #[test]
    fn test_staging_row_without_key_is_rejected() {
        assert_eq!(CleanRecord::from_row(&full_row()), None);
    }
}
