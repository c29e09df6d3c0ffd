//! Entry points: one call per build, each owning its progress reporter.

use std::future::Future;
use std::time::{Duration, Instant};

use log::info;
use tokio_util::sync::CancellationToken;

use repotree_common::{EngineConfig, TreeError};
use repotree_domain::{BuildOptions, TreeSnapshot};

use crate::cache::ResponseCache;
use crate::local::{DirectoryHandle, LocalTreeBuilder};
use crate::locator::parse_source_ref;
use crate::progress::ProgressReporter;
use crate::quota::check_quota;
use crate::remote::RemoteTreeBuilder;
use crate::source::RemoteSource;

/// Builds the tree behind a repository reference.
///
/// Runs the locator, the quota check and the two-pass traversal under one watchdog. The
/// reporter's token cancels the build; the watchdog cancels a child of it.
pub async fn build_remote_tree<S: RemoteSource>(
    source: &S,
    cache: &ResponseCache,
    config: &EngineConfig,
    reference: &str,
    options: &BuildOptions,
    reporter: &ProgressReporter,
) -> Result<TreeSnapshot, TreeError> {
    reporter.begin();
    let start = Instant::now();
    let cancel = reporter.cancel_token().child_token();

    let result = with_watchdog(config.build_timeout, &cancel, async {
        let target = parse_source_ref(reference)?;
        info!("building remote tree for {}", target.scope());
        let quota = check_quota(source, source.is_authenticated(), config, &cancel).await?;
        let builder = RemoteTreeBuilder::new(source, cache, config, options, reporter, &target, cancel.clone());
        let root = builder.build().await?;
        Ok(TreeSnapshot::new(root, start.elapsed().as_millis() as u64, quota))
    })
    .await;

    log_outcome(&result);
    reporter.finish(&result);
    result
}

/// Builds the tree below a local directory handle.
pub async fn build_local_tree<H: DirectoryHandle>(
    root: &H,
    config: &EngineConfig,
    options: &BuildOptions,
    reporter: &ProgressReporter,
) -> Result<TreeSnapshot, TreeError> {
    reporter.begin();
    let start = Instant::now();
    let cancel = reporter.cancel_token().child_token();

    let result = with_watchdog(config.build_timeout, &cancel, async {
        info!("building local tree for {}", root.name());
        let builder = LocalTreeBuilder::new(config, options, reporter, cancel.clone());
        let root = builder.build(root).await?;
        Ok(TreeSnapshot::new(root, start.elapsed().as_millis() as u64, None))
    })
    .await;

    log_outcome(&result);
    reporter.finish(&result);
    result
}

async fn with_watchdog<T, F>(limit: Duration, cancel: &CancellationToken, build: F) -> Result<T, TreeError>
where
    F: Future<Output = Result<T, TreeError>>,
{
    if cancel.is_cancelled() {
        return Err(TreeError::Cancelled);
    }
    tokio::select! {
        result = build => result,
        _ = tokio::time::sleep(limit) => {
            cancel.cancel();
            Err(TreeError::Timeout(format!("build did not finish within {} s", limit.as_secs())))
        }
    }
}

fn log_outcome(result: &Result<TreeSnapshot, TreeError>) {
    match result {
        Ok(snapshot) => info!(
            "build complete: {} files, {} bytes in {} ms",
            snapshot.file_count, snapshot.total_size, snapshot.elapsed_ms
        ),
        Err(e) => info!("build ended: {}", e),
    }
}
