//! Review analyzer backed by a chat-completion provider.
//!
//! Builds the classification prompt, parses the `Sentiment:` / `Summary:`
//! reply and maps provider failures onto transient vs permanent model errors.

use super::provider::{CompletionOptions, LlmError, LlmProvider};
use super::types::Message;
use crate::annotation::{ModelError, ModelVerdict, ReviewAnalyzer};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LlmReviewAnalyzer {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl LlmReviewAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            options: CompletionOptions::default(),
        }
    }
}

pub fn build_prompt(review_text: &str) -> String {
    format!(
        "Analyze the following customer review and provide:\n\
         1. Sentiment: Classify as exactly one of: Positive, Negative, or Neutral\n\
         2. Summary: Provide a one-sentence summary of the review\n\
         \n\
         Review: \"{}\"\n\
         \n\
         Respond in the following format:\n\
         Sentiment: [Positive/Negative/Neutral]\n\
         Summary: [One sentence summary]\n\
         \n\
         If the review is too short to summarize meaningfully, just repeat the original text as the summary.",
        review_text
    )
}

/// Parse a model reply.
///
/// The sentiment label is returned verbatim for the engine to normalize.
/// Without a `Sentiment:` line the whole reply is used as the label, so a
/// bare `Negative` still classifies. A missing or empty summary falls back
/// to the review text.
pub fn parse_reply(reply: &str, review_text: &str) -> ModelVerdict {
    let mut sentiment = None;
    let mut summary = None;

    for line in reply.lines() {
        let line = line.trim().trim_start_matches(&['*', '-', '#', ' '][..]);
        if let Some(value) = strip_label(line, "sentiment") {
            sentiment.get_or_insert_with(|| value.to_string());
        } else if let Some(value) = strip_label(line, "summary") {
            summary.get_or_insert_with(|| value.to_string());
        }
    }

    let summary = summary
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| review_text.to_string());

    ModelVerdict {
        sentiment: sentiment.unwrap_or_else(|| reply.trim().to_string()),
        summary,
    }
}

/// `"Summary: text"` -> `Some("text")`, label matched case-insensitively.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = line[label.len()..].trim_start_matches('*').trim_start();
    rest.strip_prefix(':')
        .map(|v| v.trim().trim_matches('*').trim())
}

fn to_model_error(e: LlmError) -> ModelError {
    if e.is_retryable() {
        ModelError::Transient(e.to_string())
    } else {
        ModelError::Permanent(e.to_string())
    }
}

#[async_trait]
impl ReviewAnalyzer for LlmReviewAnalyzer {
    async fn classify_and_summarize(&self, review_text: &str) -> Result<ModelVerdict, ModelError> {
        if review_text.trim().is_empty() {
            return Err(ModelError::Permanent(
                "Review text is empty, nothing to analyze".to_string(),
            ));
        }

        let messages = [Message::user(build_prompt(review_text))];
        let response = self
            .provider
            .complete(&messages, &self.options)
            .await
            .map_err(to_model_error)?;

        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            "Model reply: {}",
            response.text()
        );
        if response.is_truncated() {
            warn!(model = self.provider.model(), "Model reply hit the token limit");
        }
        Ok(parse_reply(response.text(), review_text))
    }
}
