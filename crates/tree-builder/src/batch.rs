//! Bounded fan-out over sibling entries.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use log::warn;
use tokio_util::sync::CancellationToken;

use repotree_common::TreeError;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Items in flight at once
    pub size: usize,
    /// Pause between two groups
    pub pause: Duration,
}

/// Processes `items` in groups of `opts.size`, each group concurrently, one group after another.
///
/// `process` returns `Ok(None)` for items that are intentionally skipped. An item that fails
/// with a non-terminal error is logged and dropped; a terminal error (or cancellation) stops the
/// run. The returned values keep the input order.
pub async fn run_batched<T, R, F, Fut>(
    items: Vec<T>,
    opts: BatchOptions,
    cancel: &CancellationToken,
    process: F,
) -> Result<Vec<R>, TreeError>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<Option<R>, TreeError>>,
{
    let size = opts.size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut pending = items.into_iter().peekable();

    while pending.peek().is_some() {
        if cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }

        let group: Vec<T> = pending.by_ref().take(size).collect();
        let outcomes = join_all(group.into_iter().map(|item| {
            let fut = process(item);
            async move {
                if cancel.is_cancelled() {
                    return Err(TreeError::Cancelled);
                }
                let out = fut.await;
                if cancel.is_cancelled() {
                    return Err(TreeError::Cancelled);
                }
                out
            }
        }))
        .await;

        if cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }
        for outcome in outcomes {
            match outcome {
                Ok(Some(value)) => results.push(value),
                Ok(None) => {}
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => warn!("dropping entry after failure: {}", e),
            }
        }

        if pending.peek().is_some() && !opts.pause.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TreeError::Cancelled),
                _ = tokio::time::sleep(opts.pause) => {}
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn opts(size: usize) -> BatchOptions {
        BatchOptions {
            size,
            pause: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_input_order_and_drops_failures() {
        let items: Vec<u64> = (0..25).collect();
        let out = run_batched(items, opts(10), &CancellationToken::new(), |i| async move {
            // later items finish first
            tokio::time::sleep(Duration::from_millis(100 - i)).await;
            match i {
                3 => Err(TreeError::TransientNetwork("flaky".into())),
                7 => Ok(None),
                _ => Ok(Some(i * 2)),
            }
        })
        .await
        .unwrap();

        let expected: Vec<u64> = (0..25).filter(|i| *i != 3 && *i != 7).map(|i| i * 2).collect();
        assert_eq!(out, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded_by_group_size() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let out = run_batched((0..23).collect::<Vec<_>>(), opts(5), &CancellationToken::new(), |i| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(i))
            }
        })
        .await
        .unwrap();

        assert_eq!(out.len(), 23);
        assert_eq!(peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_aborts() {
        let result = run_batched(vec![1, 2, 3], opts(2), &CancellationToken::new(), |i| async move {
            if i == 2 {
                Err(TreeError::PermissionDenied("secret".into()))
            } else {
                Ok(Some(i))
            }
        })
        .await;
        assert!(matches!(result, Err(TreeError::PermissionDenied(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_before_next_group() {
        let token = CancellationToken::new();
        let started = AtomicUsize::new(0);
        let result = run_batched((0..30).collect::<Vec<_>>(), opts(10), &token, |i| {
            let token = token.clone();
            let started = &started;
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if i == 4 {
                    token.cancel();
                }
                Ok(Some(i))
            }
        })
        .await;

        assert!(matches!(result, Err(TreeError::Cancelled)));
        assert!(started.load(Ordering::SeqCst) <= 10);
    }
}
