//! RecordCleaner: total, side-effect free transform from raw to clean records.

use super::key::RecordKey;
use super::models::{CleanRecord, RawRecord};
use std::collections::HashMap;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
const MAX_AGE: i64 = 120;

/// Trim and collapse internal whitespace runs to a single space.
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_field(value: &Option<String>) -> String {
    value.as_deref().map(clean_text).unwrap_or_default()
}

/// Out-of-range ratings are clamped into `MIN_RATING..=MAX_RATING`.
pub fn clamp_rating(rating: i64) -> u8 {
    rating.clamp(MIN_RATING as i64, MAX_RATING as i64) as u8
}

/// Clean a single record. The key is derived with occurrence 0; use
/// [`clean_all`] when duplicates within a batch must get distinct keys.
pub fn clean(raw: &RawRecord) -> CleanRecord {
    let key = RecordKey::derive(
        &clean_field(&raw.item_id),
        &clean_field(&raw.title),
        &clean_field(&raw.review_text),
        0,
    );
    clean_with_key(raw, key)
}

pub(crate) fn clean_with_key(raw: &RawRecord, record_key: RecordKey) -> CleanRecord {
    CleanRecord {
        record_key,
        item_id: clean_field(&raw.item_id),
        age: raw
            .age
            .filter(|a| (0..=MAX_AGE).contains(a))
            .map(|a| a as u32),
        title: clean_field(&raw.title),
        review_text: clean_field(&raw.review_text),
        rating: raw.rating.map(clamp_rating),
        recommended: raw.recommended.unwrap_or(false),
        positive_feedback_count: raw
            .positive_feedback_count
            .map(|c| c.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0),
        division: clean_field(&raw.division),
        department: clean_field(&raw.department),
        class_name: clean_field(&raw.class_name),
    }
}

/// Outcome of cleaning a whole raw table.
#[derive(Debug, Default)]
pub struct CleanBatch {
    pub records: Vec<CleanRecord>,
    /// Raw rows with no usable value, excluded from the result.
    pub dropped_empty: usize,
    /// Rows whose identity triple repeated an earlier row.
    pub duplicates: usize,
}

/// Clean every raw record in order, dropping empty rows and giving later
/// duplicates of the same identity triple distinct keys.
pub fn clean_all(raws: &[RawRecord]) -> CleanBatch {
    let mut batch = CleanBatch::default();
    let mut seen: HashMap<(String, String, String), usize> = HashMap::new();

    for raw in raws {
        if raw.is_empty() {
            batch.dropped_empty += 1;
            continue;
        }
        let identity = (
            clean_field(&raw.item_id),
            clean_field(&raw.title),
            clean_field(&raw.review_text),
        );
        let occurrence = seen.entry(identity.clone()).or_insert(0);
        if *occurrence > 0 {
            batch.duplicates += 1;
        }
        let key = RecordKey::derive(&identity.0, &identity.1, &identity.2, *occurrence);
        *occurrence += 1;
        batch.records.push(clean_with_key(raw, key));
    }

    batch
}
