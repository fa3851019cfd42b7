//! Ordered model fallback with rate-limit cooldowns.
//!
//! [`for_each_model`] tries each model in turn. A retryable error (a rate
//! limit) sleeps for the cooldown and retries the same model, up to
//! `attempts_per_model` attempts; any other error moves on to the next model.

use std::future::Future;
use std::time::Duration;

use crate::error::VisionError;

/// Retry budget for [`for_each_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub attempts_per_model: u32,
    /// Base cooldown after a rate limit; the actual wait is jittered up to
    /// twice this value.
    pub rate_limit_cooldown: Duration,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            attempts_per_model: 2,
            rate_limit_cooldown: Duration::from_secs(10),
        }
    }
}

/// `true` for the errors worth retrying on the same model.
#[must_use]
pub fn is_rate_limited(err: &VisionError) -> bool {
    matches!(err, VisionError::RateLimited { .. })
}

/// Runs `operation` against each model in order until one succeeds.
///
/// # Errors
///
/// Returns the last model's error when every model fails, or
/// [`VisionError::NoModels`] when `models` is empty.
pub async fn for_each_model<T, F, Fut, R>(
    models: &[String],
    policy: &FallbackPolicy,
    mut operation: F,
    is_retryable: R,
) -> Result<T, VisionError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, VisionError>>,
    R: Fn(&VisionError) -> bool,
{
    let attempts = policy.attempts_per_model.max(1);
    let mut last_error = None;

    for model in models {
        for attempt in 1..=attempts {
            match operation(model.clone()).await {
                Ok(value) => {
                    tracing::debug!(model = %model, attempt, "generation succeeded");
                    return Ok(value);
                }
                Err(err) if is_retryable(&err) && attempt < attempts => {
                    let delay = jittered(policy.rate_limit_cooldown);
                    tracing::warn!(
                        model = %model,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "rate limited, retrying same model after cooldown"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::warn!(model = %model, attempt, error = %err, "model failed, trying next");
                    last_error = Some(err);
                    break;
                }
            }
        }
    }

    Err(last_error.unwrap_or(VisionError::NoModels))
}

fn jittered(base: Duration) -> Duration {
    base.mul_f64(1.0 + rand::random::<f64>())
}
