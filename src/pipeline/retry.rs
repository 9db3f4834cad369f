//! Bounded retry with exponential backoff around one external call.
//!
//! HTTP 429 / 503 responses and dropped connections are common when the OCR
//! or generative service is under load. Each call gets `1 + max_retries`
//! attempts with waits of `retry_backoff_ms * 2^(attempt-1)`: with 500 ms and
//! 3 retries that is 500 ms → 1 s → 2 s. Permanent errors are returned
//! immediately.
//!
//! The OCR poll loop composes with this: every individual poll is retried
//! here, while the loop itself keeps polling until a terminal state.

use crate::config::PipelineConfig;
use crate::error::ServiceError;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// How many times to retry, and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Wait before retry number `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out.
///
/// `what` names the call in log lines.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff = policy.delay_for(attempt);
                warn!(
                    "{}: attempt {} failed ({}), retry {}/{} after {:?}",
                    what, attempt, e, attempt, policy.max_retries, backoff
                );
                sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
