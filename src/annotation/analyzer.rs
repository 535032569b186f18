use super::error::ModelError;
use super::models::ModelVerdict;
use async_trait::async_trait;

/// The remote model, as seen by the annotation engine: review text in,
/// sentiment label and one-sentence summary out.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ReviewAnalyzer: Send + Sync {
    async fn classify_and_summarize(&self, review_text: &str) -> Result<ModelVerdict, ModelError>;
}
