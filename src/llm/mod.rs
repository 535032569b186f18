//! LLM provider abstraction layer.
//!
//! A chat-completion provider trait with an OpenAI-compatible implementation
//! (Groq by default), and the review analyzer the annotation engine calls.

mod analyzer;
mod openai;
mod provider;
mod types;

pub use analyzer::{build_prompt, parse_reply, LlmReviewAnalyzer};
pub use openai::OpenAIProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole, TokenUsage};
