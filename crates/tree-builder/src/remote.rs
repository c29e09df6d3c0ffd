//! Two-pass traversal of a remote repository: count, then fetch.

use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use repotree_common::{EngineConfig, RetryPolicy, TreeError};
use repotree_domain::{BuildOptions, SourceRef, TreeNode};

use crate::batch::{run_batched, BatchOptions};
use crate::cache::{keys, CachedValue, ResponseCache};
use crate::inline::InlinePolicy;
use crate::progress::ProgressReporter;
use crate::retry::call_with_retry;
use crate::source::{EntryKind, RemoteEntry, RemoteSource};

pub struct RemoteTreeBuilder<'a, S> {
    source: &'a S,
    cache: &'a ResponseCache,
    options: &'a BuildOptions,
    reporter: &'a ProgressReporter,
    target: &'a SourceRef,
    cancel: CancellationToken,
    policy: RetryPolicy,
    batch: BatchOptions,
    inline: InlinePolicy,
    scope: String,
    fingerprint: String,
}

impl<'a, S: RemoteSource> RemoteTreeBuilder<'a, S> {
    pub fn new(
        source: &'a S,
        cache: &'a ResponseCache,
        config: &EngineConfig,
        options: &'a BuildOptions,
        reporter: &'a ProgressReporter,
        target: &'a SourceRef,
        cancel: CancellationToken,
    ) -> Self {
        let excluded: Vec<&str> = options.excluded_names.iter().map(String::as_str).collect();
        let fingerprint = format!(
            "{}|{}",
            excluded.join(","),
            options.max_depth.map_or_else(|| "-".to_string(), |d| d.to_string())
        );
        Self {
            source,
            cache,
            options,
            reporter,
            target,
            cancel,
            policy: config.retry_policy(),
            batch: BatchOptions {
                size: config.remote_batch_size,
                pause: config.batch_pause,
            },
            inline: InlinePolicy::new(config, options),
            scope: target.scope(),
            fingerprint,
        }
    }

    /// Counts eligible files, publishes the total, then fetches and assembles the tree.
    pub async fn build(&self) -> Result<TreeNode, TreeError> {
        let root_path = self.target.sub_path.clone();

        let total = self.count(root_path.clone(), 0).await?;
        info!("{}: {} files to fetch", self.scope, total);
        self.reporter.set_total(total);

        let children = if self.options.can_descend(0) {
            self.fetch_dir(root_path.clone(), 0).await?
        } else {
            Vec::new()
        };
        Ok(TreeNode::directory(self.target.root_name(), root_path, children))
    }

    async fn list(&self, path: &str) -> Result<Arc<Vec<RemoteEntry>>, TreeError> {
        let key = keys::listing(&self.scope, path);
        if let Some(hit) = self.cache.get_listing(&key) {
            return Ok(hit);
        }

        debug!("listing {}:{}", self.scope, path);
        let entries = call_with_retry(
            &self.policy,
            &self.cancel,
            |attempt, e| {
                warn!("listing {:?} failed ({}), retry {}", path, e, attempt);
                self.reporter.note_retry();
            },
            || self.source.list_dir(self.target, path),
        )
        .await?;

        let entries = Arc::new(entries);
        self.cache.put(key, CachedValue::Listing(entries.clone()));
        Ok(entries)
    }

    async fn content(&self, path: &str) -> Result<String, TreeError> {
        let key = keys::content(&self.scope, path);
        if let Some(hit) = self.cache.get_content(&key) {
            return Ok(hit.to_string());
        }

        let text = call_with_retry(
            &self.policy,
            &self.cancel,
            |_, _| self.reporter.note_retry(),
            || self.source.fetch_content(self.target, path),
        )
        .await?;
        self.cache.put(key, CachedValue::Content(Arc::from(text.as_str())));
        Ok(text)
    }

    /// Eligible files under the directory at `path`, which sits at `depth`.
    fn count(&self, path: String, depth: usize) -> BoxFuture<'_, Result<u64, TreeError>> {
        Box::pin(async move {
            if !self.options.can_descend(depth) {
                return Ok(0);
            }
            let key = keys::count(&self.scope, &path, &self.fingerprint);
            if let Some(n) = self.cache.get_count(&key) {
                return Ok(n);
            }

            let entries = self.list(&path).await?;
            let mut files = 0u64;
            let mut subdirs = Vec::new();
            for entry in entries.iter() {
                match entry.kind {
                    EntryKind::File | EntryKind::Symlink => files += 1,
                    EntryKind::Dir if !self.options.is_excluded(&entry.name) => {
                        subdirs.push(entry.path.clone())
                    }
                    _ => {}
                }
            }

            let nested = run_batched(subdirs, self.batch, &self.cancel, |sub| async move {
                self.count(sub, depth + 1).await.map(Some)
            })
            .await?;

            let total = files + nested.iter().sum::<u64>();
            self.cache.put(key, CachedValue::Count(total));
            Ok(total)
        })
    }

    fn fetch_dir(&self, path: String, depth: usize) -> BoxFuture<'_, Result<Vec<TreeNode>, TreeError>> {
        Box::pin(async move {
            let entries = self.list(&path).await?;
            run_batched(entries.to_vec(), self.batch, &self.cancel, |entry| {
                self.build_entry(entry, depth + 1)
            })
            .await
        })
    }

    /// Turns one listing entry at `depth` into a node; `None` for skipped entries.
    async fn build_entry(&self, entry: RemoteEntry, depth: usize) -> Result<Option<TreeNode>, TreeError> {
        match entry.kind {
            EntryKind::Dir => {
                if self.options.is_excluded(&entry.name) {
                    debug!("excluded {}", entry.path);
                    return Ok(None);
                }
                let children = if self.options.can_descend(depth) {
                    self.fetch_dir(entry.path.clone(), depth).await?
                } else {
                    Vec::new()
                };
                Ok(Some(TreeNode::directory(entry.name, entry.path, children)))
            }
            EntryKind::File | EntryKind::Symlink => {
                let mut node = TreeNode::file(entry.name, entry.path, entry.size);
                if entry.size == 0 && self.inline.wants(&node) {
                    node = node.with_content(String::new());
                } else if self.inline.wants(&node) {
                    match self.content(&node.path).await {
                        Ok(text) => node = node.with_content(text),
                        Err(TreeError::Cancelled) => return Err(TreeError::Cancelled),
                        Err(e) => warn!("keeping {} without content: {}", node.path, e),
                    }
                }
                self.reporter.file_done();
                Ok(Some(node))
            }
            EntryKind::Submodule | EntryKind::Other => {
                debug!("skipping {} ({:?})", entry.path, entry.kind);
                Ok(None)
            }
        }
    }
}
