// Retry with exponential backoff for provider calls

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::types::ProviderError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retry attempts after the first try.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
    /// Randomize each backoff to 50-100% of its nominal value.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            jitter: true,
        }
    }
}

impl RetryConfig {
    fn backoff_for(&self, retry_index: u32) -> Duration {
        let nominal = self.base_delay.as_millis() as f64 * 2f64.powi(retry_index as i32);
        let ms = if self.jitter {
            let factor = 0.5 + rand::thread_rng().gen::<f64>() * 0.5;
            nominal * factor
        } else {
            nominal
        };
        Duration::from_millis(ms as u64)
    }
}

/// Run `operation`, retrying transient provider failures with exponential
/// backoff. `on_retry` fires before every backoff sleep so the caller can
/// surface a "retrying" notice to the user. Non-transient errors propagate
/// immediately; once the retry budget is spent the last error propagates.
pub async fn with_retry<F, Fut, T, N>(
    config: &RetryConfig,
    operation_name: &str,
    mut on_retry: N,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    N: FnMut(u32, Duration),
{
    let mut retries_used = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if !error.is_transient() || retries_used >= config.max_retries {
                    return Err(error);
                }

                let delay = config.backoff_for(retries_used);
                retries_used += 1;
                warn!(
                    operation = operation_name,
                    retry = retries_used,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient provider error, backing off"
                );
                on_retry(retries_used, delay);
                sleep(delay).await;
            }
        }
    }
}
