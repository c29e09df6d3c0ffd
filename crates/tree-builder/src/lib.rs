pub mod batch;
pub mod build;
pub mod cache;
pub mod github;
mod inline;
pub mod local;
pub mod locator;
pub mod progress;
pub mod quota;
pub mod remote;
pub mod retry;
pub mod source;

pub use build::{build_local_tree, build_remote_tree};
pub use cache::ResponseCache;
pub use github::GithubClient;
pub use local::{DirectoryHandle, FsDirectory, LocalEntry, LocalTreeBuilder};
pub use locator::parse_source_ref;
pub use progress::{ProgressCb, ProgressReporter};
pub use remote::RemoteTreeBuilder;
pub use source::{EntryKind, RemoteEntry, RemoteSource};

pub use repotree_common::{EngineConfig, RetryPolicy, TreeError};
pub use repotree_domain::*;
pub use tokio_util::sync::CancellationToken;
