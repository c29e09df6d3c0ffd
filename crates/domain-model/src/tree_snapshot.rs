use serde::{Deserialize, Serialize};

use crate::{QuotaInfo, TreeNode};

/// 构建结果，包含树结构与各项指标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root: TreeNode,
    pub file_count: u64,
    pub total_size: u64,
    pub elapsed_ms: u64,
    /// Quota reported before a remote build started, when the check succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaInfo>,
}

impl TreeSnapshot {
    pub fn new(root: TreeNode, elapsed_ms: u64, quota: Option<QuotaInfo>) -> Self {
        Self {
            file_count: root.file_count(),
            total_size: root.total_size(),
            root,
            elapsed_ms,
            quota,
        }
    }
}
