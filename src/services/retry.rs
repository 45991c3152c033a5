use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Attempt limit and base backoff delay for calls to the generation
/// capability. Stage-agnostic; every pipeline stage shares one policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Run `op` until it succeeds, a failure is classified permanent, or the
/// attempt limit is reached.
///
/// Transient failures back off `base_delay * 2^attempt` before the next try;
/// permanent failures and attempt exhaustion return the error as-is.
pub async fn retry_with_backoff<T, E, Fut, Op, Classify>(
    policy: RetryPolicy,
    is_transient: Classify,
    mut op: Op,
) -> Result<T, E>
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
    Op: FnMut() -> Fut,
    Classify: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);

    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_transient(&err) || attempt + 1 >= max_attempts {
                    return Err(err);
                }
                let delay = policy.base_delay * 2u32.saturating_pow(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off before retry"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
