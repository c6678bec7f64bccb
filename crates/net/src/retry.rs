use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::RetryParameters;

/// Outcome of one attempt, fed back into [`retry_with_backoff`].
pub enum RetryAction<T, E> {
    Success(T),
    Retry(E),
    Fail(E),
}

fn delay_for_attempt(params: &RetryParameters, attempt: u32) -> Duration {
    let exp = params.backoff_factor.powi(attempt as i32);
    let base_ms = params.base_delay.as_millis() as f64 * exp;
    let jitter = if params.fuzz_factor > 0.0 {
        let mut rng = rand::rng();
        let factor = 1.0 + rng.random_range(-params.fuzz_factor..=params.fuzz_factor);
        base_ms * factor.max(0.0)
    } else {
        base_ms
    };
    Duration::from_millis(jitter.round() as u64)
}

/// Retries `attempt` up to `params.max_attempts` times with exponential
/// back-off and jitter, racing every sleep against `token`.
///
/// Grounded on the teacher's `mesio::hls::retry::retry_with_backoff`: same
/// `tokio::select!` shape, same `RetryAction` three-way split between
/// success, retryable failure and permanent failure.
pub async fn retry_with_backoff<T, E, F, Fut>(
    params: &RetryParameters,
    token: &CancellationToken,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = RetryAction<T, E>>,
{
    let mut last_err = None;
    for attempt_no in 0..params.max_attempts {
        if token.is_cancelled() {
            break;
        }
        match attempt(attempt_no).await {
            RetryAction::Success(v) => return Ok(v),
            RetryAction::Fail(e) => return Err(e),
            RetryAction::Retry(e) => {
                last_err = Some(e);
                if attempt_no + 1 >= params.max_attempts {
                    break;
                }
                let delay = delay_for_attempt(params, attempt_no);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
    Err(last_err.expect("retry loop always records an error before exiting without success"))
}
