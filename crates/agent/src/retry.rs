use std::future::Future;
use std::time::Duration;

use tracing::warn;
use tripsmith_core::config::RetryPolicy;

const DEFAULT_BASE_DELAY_MS: u64 = 250;
const DEFAULT_MAX_DELAY_MS: u64 = 4_000;

/// Re-runs a remote call according to a [`RetryPolicy`], backing off
/// exponentially between attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryRunner {
    policy: RetryPolicy,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, base_delay_ms: DEFAULT_BASE_DELAY_MS, max_delay_ms: DEFAULT_MAX_DELAY_MS }
    }

    pub fn with_delays(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    pub async fn run<T, E, Op, Fut>(
        &self,
        operation: &'static str,
        is_retryable: fn(&E) -> bool,
        mut call: Op,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let total_attempts = self.policy.total_attempts();
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt + 1 >= total_attempts || !is_retryable(&error) {
                        return Err(error);
                    }
                    warn!(
                        event_name = "planner.remote.retry",
                        operation,
                        attempt,
                        total_attempts,
                        error = %error,
                        "remote call failed; retrying"
                    );

                    let delay = self.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
