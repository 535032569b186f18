//! Per-record annotation state machine.
//!
//! `Pending -> Attempting(n) -> Success | Failed`. Transitions are pure: the
//! caller performs the model call and the backoff sleep, the state machine
//! only decides what happens next.

use super::error::ModelError;
use super::models::{ModelVerdict, Sentiment};
use crate::retry_policy::RetryPolicy;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    /// Attempt number, starting at 1.
    Attempting(u32),
    Success {
        sentiment: Sentiment,
        summary: String,
        attempts: u32,
    },
    Failed {
        reason: String,
        attempts: u32,
    },
}

impl RecordState {
    pub fn begin(&self) -> RecordState {
        match self {
            RecordState::Pending => RecordState::Attempting(1),
            other => other.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordState::Success { .. } | RecordState::Failed { .. })
    }

    /// Apply the outcome of the current attempt. Returns the next state and,
    /// when another attempt follows, the delay to observe before it.
    ///
    /// Outcomes delivered outside `Attempting` leave the state unchanged.
    pub fn advance(
        &self,
        outcome: Result<ModelVerdict, ModelError>,
        policy: &RetryPolicy,
    ) -> (RecordState, Option<Duration>) {
        let attempt = match self {
            RecordState::Attempting(attempt) => *attempt,
            other => return (other.clone(), None),
        };

        match outcome {
            Ok(verdict) => match Sentiment::normalize(&verdict.sentiment) {
                Some(sentiment) => (
                    RecordState::Success {
                        sentiment,
                        summary: verdict.summary,
                        attempts: attempt,
                    },
                    None,
                ),
                None => (
                    RecordState::Failed {
                        reason: format!("Unrecognized sentiment label '{}'", verdict.sentiment),
                        attempts: attempt,
                    },
                    None,
                ),
            },
            Err(e) => {
                let retries_so_far = attempt - 1;
                if policy.should_retry(e.is_retryable(), retries_so_far) {
                    (
                        RecordState::Attempting(attempt + 1),
                        Some(policy.backoff(retries_so_far)),
                    )
                } else {
                    (
                        RecordState::Failed {
                            reason: e.to_string(),
                            attempts: attempt,
                        },
                        None,
                    )
                }
            }
        }
    }
}
