//! Traversal of a user-granted local directory.

use std::future::Future;
use std::path::PathBuf;

use futures::future::BoxFuture;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use repotree_common::{EngineConfig, TreeError};
use repotree_domain::{BuildOptions, TreeNode};

use crate::batch::{run_batched, BatchOptions};
use crate::inline::InlinePolicy;
use crate::progress::ProgressReporter;

pub enum LocalEntry<H> {
    File { name: String, size: u64 },
    Directory(H),
}

/// An opaque handle to a directory the user granted access to.
pub trait DirectoryHandle: Send + Sync + Sized {
    fn name(&self) -> &str;

    /// Entries in the order the platform reports them.
    fn entries(&self) -> impl Future<Output = Result<Vec<LocalEntry<Self>>, TreeError>> + Send;

    fn read_text(&self, file_name: &str) -> impl Future<Output = Result<String, TreeError>> + Send;
}

/// 规范化路径（支持正斜杠、去除首尾空白）
fn normalize_path(path: &str) -> PathBuf {
    let s = path.trim();
    #[cfg(windows)]
    let s = s.replace('/', "\\");
    PathBuf::from(s)
}

/// A directory on the local filesystem.
///
/// Symbolic links are listed as files and never descended, so the walk stays acyclic.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    path: PathBuf,
    name: String,
}

impl FsDirectory {
    /// Resolves `path` and checks that it is a readable directory.
    pub async fn open(path: &str) -> Result<Self, TreeError> {
        let raw = normalize_path(path);
        if raw.as_os_str().is_empty() {
            return Err(TreeError::InvalidInput("empty path".to_string()));
        }
        let path = tokio::fs::canonicalize(&raw)
            .await
            .map_err(|e| TreeError::from_io(e, path))?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| TreeError::from_io(e, &path.display().to_string()))?;
        if !metadata.is_dir() {
            return Err(TreeError::InvalidInput(format!("not a directory: {}", path.display())));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { path, name })
    }
}

impl DirectoryHandle for FsDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entries(&self) -> Result<Vec<LocalEntry<Self>>, TreeError> {
        let shown = self.path.display().to_string();
        let mut reader = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| TreeError::from_io(e, &shown))?;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| TreeError::from_io(e, &shown))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let child = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!("skipping {}: {}", child.display(), e);
                    continue;
                }
            };
            if file_type.is_dir() {
                dirs.push(FsDirectory { path: child, name });
                continue;
            }
            if !file_type.is_symlink() {
                let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                files.push((name, size));
                continue;
            }

            // links are never descended; a link to a file reports the target's size
            let target = match tokio::fs::metadata(&child).await {
                Ok(m) => m,
                Err(e) => {
                    warn!("skipping dangling link {}: {}", child.display(), e);
                    continue;
                }
            };
            let size = if target.is_dir() {
                tokio::fs::symlink_metadata(&child).await.map(|m| m.len()).unwrap_or(0)
            } else {
                target.len()
            };
            files.push((name, size));
        }

        // 目录在前，其余按名称排序
        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs
            .into_iter()
            .map(LocalEntry::Directory)
            .chain(files.into_iter().map(|(name, size)| LocalEntry::File { name, size }))
            .collect())
    }

    async fn read_text(&self, file_name: &str) -> Result<String, TreeError> {
        let path = self.path.join(file_name);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| TreeError::from_io(e, &path.display().to_string()))?;
        String::from_utf8(bytes)
            .map_err(|_| TreeError::InvalidInput(format!("{} is not UTF-8 text", path.display())))
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

pub struct LocalTreeBuilder<'a> {
    options: &'a BuildOptions,
    reporter: &'a ProgressReporter,
    cancel: CancellationToken,
    batch: BatchOptions,
    inline: InlinePolicy,
}

impl<'a> LocalTreeBuilder<'a> {
    pub fn new(
        config: &EngineConfig,
        options: &'a BuildOptions,
        reporter: &'a ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            options,
            reporter,
            cancel,
            batch: BatchOptions {
                size: config.local_batch_size,
                pause: config.batch_pause,
            },
            inline: InlinePolicy::new(config, options),
        }
    }

    /// Walks `root`; the total grows as directories are listed.
    pub async fn build<H: DirectoryHandle>(&self, root: &H) -> Result<TreeNode, TreeError> {
        let root_path = root.name().to_string();
        let children = if self.options.can_descend(0) {
            self.build_dir(root, root_path.clone(), 0).await?
        } else {
            Vec::new()
        };
        Ok(TreeNode::directory(root.name(), root_path, children))
    }

    fn build_dir<'f, H: DirectoryHandle>(
        &'f self,
        dir: &'f H,
        path: String,
        depth: usize,
    ) -> BoxFuture<'f, Result<Vec<TreeNode>, TreeError>> {
        Box::pin(async move {
            if self.cancel.is_cancelled() {
                return Err(TreeError::Cancelled);
            }
            let entries = dir.entries().await?;
            let files = entries
                .iter()
                .filter(|e| matches!(e, LocalEntry::File { .. }))
                .count();
            self.reporter.add_to_total(files as u64);

            let path = path.as_str();
            run_batched(entries, self.batch, &self.cancel, |entry| {
                self.build_entry(dir, path, entry, depth + 1)
            })
            .await
        })
    }

    async fn build_entry<H: DirectoryHandle>(
        &self,
        parent: &H,
        parent_path: &str,
        entry: LocalEntry<H>,
        depth: usize,
    ) -> Result<Option<TreeNode>, TreeError> {
        match entry {
            LocalEntry::Directory(child) => {
                let name = child.name().to_string();
                if self.options.is_excluded(&name) {
                    debug!("excluded {}", join(parent_path, &name));
                    return Ok(None);
                }
                let path = join(parent_path, &name);
                let children = if self.options.can_descend(depth) {
                    match self.build_dir(&child, path.clone(), depth).await {
                        Ok(children) => children,
                        // removed after its parent was listed
                        Err(TreeError::NotFound(_)) => {
                            warn!("{} disappeared during the walk, skipping", path);
                            return Ok(None);
                        }
                        Err(e) => return Err(e),
                    }
                } else {
                    Vec::new()
                };
                Ok(Some(TreeNode::directory(name, path, children)))
            }
            LocalEntry::File { name, size } => {
                let mut node = TreeNode::file(name.as_str(), join(parent_path, &name), size);
                if self.inline.wants(&node) {
                    match parent.read_text(&name).await {
                        Ok(text) => node = node.with_content(text),
                        Err(e) => debug!("keeping {} without content: {}", node.path, e),
                    }
                }
                self.reporter.file_done();
                Ok(Some(node))
            }
        }
    }
}
