//! ReportGenerator: a pure function of the staged records and annotations.

use super::models::{Report, SentimentDistribution, TopClass, TopClasses, UNKNOWN_CLASS};
use crate::annotation::{Annotation, Sentiment};
use crate::cleaning::{CleanRecord, RecordKey};
use std::collections::{BTreeMap, HashMap};

/// Join annotations to records by key and aggregate sentiment per class.
///
/// Records without an annotation, or whose annotation failed, are counted
/// separately and never contribute to a percentage. Annotations whose key
/// matches no record are ignored.
pub fn generate(annotations: &[Annotation], records: &[CleanRecord]) -> Report {
    let by_key: HashMap<&RecordKey, &Annotation> =
        annotations.iter().map(|a| (&a.record_key, a)).collect();

    let mut report = Report {
        total_records: records.len(),
        ..Default::default()
    };
    let mut overall: BTreeMap<Sentiment, usize> = BTreeMap::new();
    let mut classes: BTreeMap<String, BTreeMap<Sentiment, usize>> = BTreeMap::new();

    for record in records {
        let sentiment = match by_key.get(&record.record_key) {
            None => {
                report.unannotated += 1;
                continue;
            }
            Some(annotation) => match annotation.sentiment {
                Some(sentiment) if annotation.is_success() => sentiment,
                _ => {
                    report.failed += 1;
                    continue;
                }
            },
        };

        report.annotated += 1;
        *overall.entry(sentiment).or_default() += 1;
        let class_name = if record.class_name.is_empty() {
            UNKNOWN_CLASS.to_string()
        } else {
            record.class_name.clone()
        };
        *classes
            .entry(class_name)
            .or_default()
            .entry(sentiment)
            .or_default() += 1;
    }

    report.overall = SentimentDistribution::from_counts(&overall);
    report.by_class = classes
        .into_iter()
        .map(|(class, counts)| (class, SentimentDistribution::from_counts(&counts)))
        .collect();
    report.top_classes = TopClasses {
        highest_positive: top_class(&report.by_class, Sentiment::Positive),
        highest_negative: top_class(&report.by_class, Sentiment::Negative),
        highest_neutral: top_class(&report.by_class, Sentiment::Neutral),
    };
    report
}

/// Highest share wins; ties go to the first class in name order.
fn top_class(by_class: &BTreeMap<String, SentimentDistribution>, sentiment: Sentiment) -> TopClass {
    let mut top = TopClass::default();
    for (class, distribution) in by_class {
        let share = distribution.share(sentiment);
        if share.count > 0 && (top.class_name.is_none() || share.percentage > top.percentage) {
            top = TopClass {
                class_name: Some(class.clone()),
                percentage: share.percentage,
            };
        }
    }
    top
}
