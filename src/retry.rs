use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry: a fixed number of attempts with a fixed delay between
/// them. The final failure is returned unchanged once the budget runs out.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Injectable wait between attempts, so tests can observe delays
/// instead of sleeping through them.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `op` under the policy. Only retryable errors (transport
/// failures, non-success statuses) consume attempts; anything else
/// surfaces immediately.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, delay: &dyn Delay, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(attempt, error = %err, "Lookup attempt failed, retrying after delay");
                delay.sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
