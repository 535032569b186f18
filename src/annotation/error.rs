use thiserror::Error;

/// Failure of one model call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Rate limiting, timeouts, 5xx. Retrying is expected to help.
    #[error("Transient model error: {0}")]
    Transient(String),

    /// Malformed input or rejected credentials. Retrying will not help.
    #[error("Permanent model error: {0}")]
    Permanent(String),
}

impl ModelError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::Transient(_))
    }
}
