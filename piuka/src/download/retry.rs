//! Retry loop shared by every download phase.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{AttemptError, FetchError, Phase};
use crate::executor::RetryPolicy;
use crate::telemetry::EngineMetrics;

/// Runs `attempt` until it succeeds or the policy gives up.
///
/// The failure counter starts at zero on every call. Each attempt and each
/// backoff sleep is raced against `shutdown`; cancellation wins over a
/// result that becomes ready at the same time.
pub(crate) async fn retry_phase<T, F, Fut>(
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
    metrics: &EngineMetrics,
    phase: Phase,
    mut attempt: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut failures: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(FetchError::Cancelled),
            result = attempt() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        failures += 1;
        metrics.attempt_failed();

        let Some(delay) = policy.delay_for_attempt(failures) else {
            warn!(phase = %phase, attempts = failures, error = %err, "Giving up");
            return Err(FetchError::RetryExhausted {
                phase,
                attempts: failures,
                last: err,
            });
        };

        debug!(
            phase = %phase,
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Attempt failed, retrying"
        );

        if !delay.is_zero() {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
