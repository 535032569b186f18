//! Scripted model collaborator.
//!
//! Answers by keyword and records every call, so tests can assert how many
//! requests reached the model for each review.

#![allow(dead_code)]

use async_trait::async_trait;
use review_insights::annotation::{ModelError, ModelVerdict, ReviewAnalyzer};
use review_insights::llm::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct ScriptedAnalyzer {
    calls: Mutex<HashMap<String, usize>>,
    /// Review texts that always fail with a transient error.
    flaky: HashSet<String>,
    /// Cancelled once this many calls have been answered.
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, review_text: &str) -> Self {
        self.flaky.insert(review_text.to_string());
        self
    }

    pub fn cancelling_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn calls_for(&self, review_text: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(review_text)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ReviewAnalyzer for ScriptedAnalyzer {
    async fn classify_and_summarize(&self, review_text: &str) -> Result<ModelVerdict, ModelError> {
        let total = {
            let mut calls = self.calls.lock().unwrap();
            *calls.entry(review_text.to_string()).or_default() += 1;
            calls.values().sum::<usize>()
        };
        if let Some((limit, token)) = &self.cancel_after {
            if total >= *limit {
                token.cancel();
            }
        }

        if self.flaky.contains(review_text) {
            return Err(ModelError::Transient("503 Service Unavailable".to_string()));
        }

        let lowered = review_text.to_lowercase();
        let sentiment = if lowered.contains("love") {
            "Positive"
        } else if lowered.contains("disappointed") {
            "**Negative**"
        } else {
            "neutral."
        };
        Ok(ModelVerdict {
            sentiment: sentiment.to_string(),
            summary: format!("Summary of: {}", review_text),
        })
    }
}

/// Chat provider that always answers with the same reply.
pub struct CannedProvider {
    reply: String,
    calls: Mutex<usize>,
}

impl CannedProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned-model"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        *self.calls.lock().unwrap() += 1;
        Ok(CompletionResponse {
            message: Message::assistant(self.reply.clone()),
            finish_reason: FinishReason::Stop,
            usage: None,
        })
    }
}
