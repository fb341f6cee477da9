use crate::{ReportError, ReportSink};
use async_trait::async_trait;
use std::time::Duration;

/// Bounded fixed-delay retry for rate-limited sink calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(30),
        }
    }
}

pub struct RetryingSink<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ReportSink> RetryingSink<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ReportSink> ReportSink for RetryingSink<S> {
    async fn append_rows(
        &self,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), ReportError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.append_rows(sheet, header, rows).await {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        sheet,
                        attempt,
                        max_attempts,
                        delay_ms = self.policy.delay.as_millis() as u64,
                        error = %err,
                        "report sink call failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
