//! LLM annotation of staged reviews
//!
//! Exactly-once-per-record annotation keyed by record key: records that
//! already have a successful annotation in the processed worksheet never
//! reach the model again.

mod analyzer;
mod engine;
mod error;
mod models;
mod state;
mod throttle;

#[cfg(any(test, feature = "mock"))]
pub use analyzer::MockReviewAnalyzer;
pub use analyzer::ReviewAnalyzer;
pub use engine::{load_annotations, AnnotationEngine, AnnotationOutcome, AnnotationTally};
pub use error::ModelError;
pub use models::{
    columns, Annotation, AnnotationStatus, ModelVerdict, Sentiment, PROCESSED_COLUMNS,
};
pub use state::RecordState;
pub use throttle::{
    NoOpThrottler, RequestThrottler, SlidingWindowThrottler, ThrottleStats, ThrottlerConfig,
};
