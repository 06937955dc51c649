use std::future::Future;
use std::time::Duration;

use crate::api::RequestError;

/// Exponential backoff without jitter: attempt `i` (0-based) is followed by
/// a wait of `base_delay * 2^i`, except after the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no waiting. Used by tests against mock servers.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

/// Run `attempt` until it succeeds or the policy's attempts are used up,
/// returning the last error in the latter case.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut index = 0;

    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if index + 1 >= max_attempts {
            tracing::error!(request = label, attempts = max_attempts, error = %err, "request failed");
            return Err(err);
        }

        let wait = policy.delay_for(index);
        tracing::warn!(
            request = label,
            attempt = index + 1,
            max_attempts,
            error = %err,
            "request failed, retrying in {wait:?}"
        );
        tokio::time::sleep(wait).await;
        index += 1;
    }
}
