use std::future::Future;

use serde::Deserialize;

use repotree_common::TreeError;
use repotree_domain::{QuotaInfo, SourceRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry of a remote directory listing, as reported by the contents API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    /// Repository-relative path
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
}

impl RemoteEntry {
    pub fn file(path: &str, size: u64) -> Self {
        Self::new(path, EntryKind::File, size)
    }

    pub fn dir(path: &str) -> Self {
        Self::new(path, EntryKind::Dir, 0)
    }

    fn new(path: &str, kind: EntryKind, size: u64) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        Self {
            name,
            path: path.to_string(),
            kind,
            size,
        }
    }
}

/// A remote source-control host reachable through a REST API.
///
/// Implementations classify every failure into a [`TreeError`] before returning it; callers
/// never look at status codes or messages.
pub trait RemoteSource: Send + Sync {
    /// Whether requests carry a credential; decides the wording of quota errors.
    fn is_authenticated(&self) -> bool;

    fn rate_limit(&self) -> impl Future<Output = Result<QuotaInfo, TreeError>> + Send;

    /// Lists the directory at `path` (empty for the repository root), in source order.
    fn list_dir(
        &self,
        source: &SourceRef,
        path: &str,
    ) -> impl Future<Output = Result<Vec<RemoteEntry>, TreeError>> + Send;

    fn fetch_content(
        &self,
        source: &SourceRef,
        path: &str,
    ) -> impl Future<Output = Result<String, TreeError>> + Send;
}
