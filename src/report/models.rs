use crate::annotation::Sentiment;
use serde::Serialize;
use std::collections::BTreeMap;

/// Class name used for records whose class cell was empty.
pub const UNKNOWN_CLASS: &str = "Unknown";

/// Round a percentage to two decimals.
pub fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SentimentShare {
    pub count: usize,
    pub percentage: f64,
}

/// Sentiment counts of one group of successfully annotated records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentDistribution {
    pub total: usize,
    pub positive: SentimentShare,
    pub negative: SentimentShare,
    pub neutral: SentimentShare,
}

impl SentimentDistribution {
    pub fn from_counts(counts: &BTreeMap<Sentiment, usize>) -> Self {
        let total: usize = counts.values().sum();
        let share = |sentiment: Sentiment| {
            let count = counts.get(&sentiment).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0.0
            } else {
                round_percentage(100.0 * count as f64 / total as f64)
            };
            SentimentShare { count, percentage }
        };
        Self {
            total,
            positive: share(Sentiment::Positive),
            negative: share(Sentiment::Negative),
            neutral: share(Sentiment::Neutral),
        }
    }

    pub fn share(&self, sentiment: Sentiment) -> SentimentShare {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }
}

/// Class with the highest share of one sentiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopClass {
    /// `None` when no class has a record with this sentiment.
    pub class_name: Option<String>,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopClasses {
    pub highest_positive: TopClass,
    pub highest_negative: TopClass,
    pub highest_neutral: TopClass,
}

impl TopClasses {
    pub fn get(&self, sentiment: Sentiment) -> &TopClass {
        match sentiment {
            Sentiment::Positive => &self.highest_positive,
            Sentiment::Negative => &self.highest_negative,
            Sentiment::Neutral => &self.highest_neutral,
        }
    }
}

/// Aggregate view of an annotation run. Recomputed on every invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Staged records the report was computed over.
    pub total_records: usize,
    /// Records with a successful annotation, the basis of every percentage.
    pub annotated: usize,
    /// Records whose latest annotation failed; excluded from percentages.
    pub failed: usize,
    /// Records without any annotation; excluded from percentages.
    pub unannotated: usize,
    pub overall: SentimentDistribution,
    pub by_class: BTreeMap<String, SentimentDistribution>,
    pub top_classes: TopClasses,
}
