use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

const FIELD_SEPARATOR: u8 = 0x1f;
const KEY_LENGTH: usize = 32;

/// Stable identity of a review across pipeline stages and runs.
///
/// Derived from the cleaned `{item_id, title, review_text}` triple, never
/// from the row position, so reordering the raw worksheet keeps every key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// `occurrence` is 0 for the first row carrying a given triple and counts
    /// up for later duplicates, which keeps keys unique within a run.
    pub fn derive(item_id: &str, title: &str, review_text: &str, occurrence: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(item_id.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(title.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(review_text.as_bytes());
        if occurrence > 0 {
            hasher.update([FIELD_SEPARATOR]);
            hasher.update(format!("#{}", occurrence).as_bytes());
        }
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(KEY_LENGTH);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
