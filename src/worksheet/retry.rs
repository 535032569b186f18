//! Store-boundary retry.
//!
//! Every call is retried on `StoreError::Unavailable` with exponential
//! backoff. Once the retry budget is spent the last error is returned and
//! the caller treats it as fatal.

use super::error::StoreError;
use super::models::{Row, WriteMode};
use super::store::WorksheetStore;
use crate::retry_policy::RetryPolicy;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, warn};

pub struct RetryingStore {
    inner: Arc<dyn WorksheetStore>,
    policy: RetryPolicy,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn WorksheetStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn retry<T, F, Fut>(
        &self,
        operation: &str,
        table: &str,
        mut call: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if self.policy.should_retry(e.is_retryable(), retries) => {
                    let delay = self.policy.backoff(retries);
                    warn!(
                        operation,
                        table,
                        retry = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Worksheet call failed: {}, retrying",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!(
                            operation,
                            table, "Worksheet store still unavailable after {} retries", retries
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl WorksheetStore for RetryingStore {
    async fn read_table(&self, name: &str) -> Result<Vec<Row>, StoreError> {
        let inner = &self.inner;
        self.retry("read_table", name, move || inner.read_table(name))
            .await
    }

    async fn write_table(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[Row],
        mode: &WriteMode,
    ) -> Result<(), StoreError> {
        let inner = &self.inner;
        self.retry("write_table", name, move || {
            inner.write_table(name, columns, rows, mode)
        })
        .await
    }

    async fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let inner = &self.inner;
        self.retry("table_exists", name, move || inner.table_exists(name))
            .await
    }

    async fn is_protected(&self, name: &str) -> Result<bool, StoreError> {
        let inner = &self.inner;
        self.retry("is_protected", name, move || inner.is_protected(name))
            .await
    }

    async fn create_table(&self, name: &str) -> Result<(), StoreError> {
        let inner = &self.inner;
        self.retry("create_table", name, move || inner.create_table(name))
            .await
    }

    async fn clear_table(&self, name: &str) -> Result<(), StoreError> {
        let inner = &self.inner;
        self.retry("clear_table", name, move || inner.clear_table(name))
            .await
    }
}
