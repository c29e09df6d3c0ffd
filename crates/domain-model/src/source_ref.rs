use serde::{Deserialize, Serialize};

/// Parsed remote repository reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub owner: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Path inside the repository, without leading or trailing slashes; empty for the root
    #[serde(default)]
    pub sub_path: String,
}

impl SourceRef {
    /// Cache scope: `owner/repo@branch`.
    pub fn scope(&self) -> String {
        format!(
            "{}/{}@{}",
            self.owner,
            self.repo,
            self.branch.as_deref().unwrap_or("HEAD")
        )
    }

    /// Name given to the root node.
    pub fn root_name(&self) -> &str {
        self.sub_path
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.repo)
    }
}

/// Rate-limit state of the remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub limit: u64,
    pub remaining: u64,
    /// Unix 时间戳（秒），配额重置时间
    pub reset_at: u64,
}
