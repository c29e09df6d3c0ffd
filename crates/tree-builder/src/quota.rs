//! Pre-flight check of the remote rate limit.

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use repotree_common::{EngineConfig, RetryPolicy, TreeError};
use repotree_domain::QuotaInfo;

use crate::retry::call_with_retry;
use crate::source::RemoteSource;

/// Reads the current quota once.
///
/// Fails with [`TreeError::QuotaExceeded`] when nothing is left. Any other failure of the check
/// itself is logged and the build goes ahead (`Ok(None)`).
pub async fn check_quota<S: RemoteSource>(
    source: &S,
    authenticated: bool,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Option<QuotaInfo>, TreeError> {
    let policy = RetryPolicy {
        max_retries: 0,
        ..config.retry_policy()
    };

    let quota = match call_with_retry(&policy, cancel, |_, _| {}, || source.rate_limit()).await {
        Ok(q) => q,
        Err(TreeError::Cancelled) => return Err(TreeError::Cancelled),
        Err(TreeError::QuotaExceeded { reset_at, .. }) => {
            return Err(TreeError::QuotaExceeded {
                reset_at,
                authenticated,
            })
        }
        Err(e) => {
            warn!("rate limit check failed, continuing without it: {}", e);
            return Ok(None);
        }
    };

    if quota.remaining == 0 {
        return Err(TreeError::QuotaExceeded {
            reset_at: quota.reset_at,
            authenticated,
        });
    }
    if quota.remaining < config.low_quota_threshold {
        warn!(
            "only {}/{} API requests left until {} (unix time)",
            quota.remaining, quota.limit, quota.reset_at
        );
    } else {
        info!("API quota: {}/{} requests left", quota.remaining, quota.limit);
    }
    Ok(Some(quota))
}
