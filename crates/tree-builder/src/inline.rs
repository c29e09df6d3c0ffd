use std::collections::HashSet;

use repotree_common::EngineConfig;
use repotree_domain::{BuildOptions, TreeNode};

/// Decides which files get their text inlined.
#[derive(Debug, Clone)]
pub(crate) struct InlinePolicy {
    threshold: u64,
    extensions: HashSet<String>,
}

impl InlinePolicy {
    pub(crate) fn new(config: &EngineConfig, options: &BuildOptions) -> Self {
        Self {
            threshold: config.text_size_threshold,
            extensions: options.text_extensions(),
        }
    }

    pub(crate) fn wants(&self, node: &TreeNode) -> bool {
        let small = node.size.is_some_and(|s| s < self.threshold);
        small
            && node
                .extension
                .as_ref()
                .is_some_and(|ext| self.extensions.contains(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_small_text_files_only() {
        let policy = InlinePolicy::new(&EngineConfig::default(), &BuildOptions::default());
        assert!(policy.wants(&TreeNode::file("a.rs", "a.rs", 10)));
        assert!(policy.wants(&TreeNode::file("A.MD", "A.MD", 10)));
        assert!(!policy.wants(&TreeNode::file("big.rs", "big.rs", 100 * 1024)));
        assert!(!policy.wants(&TreeNode::file("logo.png", "logo.png", 10)));
        assert!(!policy.wants(&TreeNode::file("Makefile", "Makefile", 10)));
        assert!(!policy.wants(&TreeNode::directory("src.rs", "src.rs", vec![])));
    }
}
