use thiserror::Error;

/// Errors that can occur when talking to the worksheet store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transport or authentication failure. Callers retry these.
    #[error("Worksheet store unavailable: {0}")]
    Unavailable(String),

    #[error("Worksheet '{0}' not found")]
    TableNotFound(String),

    /// A write targeted a protected worksheet. Always a programming error.
    #[error("Refusing to write to protected worksheet '{0}'")]
    ProtectedTableWriteRejected(String),

    #[error("Worksheet '{table}' is malformed: {reason}")]
    MalformedTable { table: String, reason: String },
}

impl StoreError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
