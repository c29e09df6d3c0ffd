//! Resilient wrapper around a single remote call: timeout, classification, backoff, cancellation.

use std::future::Future;

use log::debug;
use tokio_util::sync::CancellationToken;

use repotree_common::{RetryPolicy, TreeError};

/// Runs `op` until it succeeds, fails terminally or the retry budget is spent.
///
/// Each attempt is raced against `policy.call_timeout` and against `cancel`. Retryable failures
/// are retried after `base_delay * 2^attempt`, calling `on_retry(next_attempt, &error)` first.
/// Once the budget is spent a retryable failure surfaces as [`TreeError::Timeout`].
pub async fn call_with_retry<T, F, Fut, R>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut on_retry: R,
    mut op: F,
) -> Result<T, TreeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TreeError>>,
    R: FnMut(u32, &TreeError),
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TreeError::Cancelled),
            r = tokio::time::timeout(policy.call_timeout, op()) => match r {
                Ok(result) => result,
                Err(_) => Err(TreeError::Timeout(format!(
                    "no response within {} ms",
                    policy.call_timeout.as_millis()
                ))),
            },
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !err.is_retryable() {
            return Err(err);
        }
        if attempt >= policy.max_retries {
            return Err(match err {
                TreeError::TransientNetwork(msg) => TreeError::Timeout(format!(
                    "gave up after {} attempts: {}",
                    attempt + 1,
                    msg
                )),
                other => other,
            });
        }

        let delay = policy.delay_for(attempt);
        attempt += 1;
        debug!("attempt {} failed ({}), retrying in {:?}", attempt, err, delay);
        on_retry(attempt, &err);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TreeError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
