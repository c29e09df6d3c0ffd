use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// Groups of extensions whose files are treated as text and may be inlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatCategory {
    Code,
    Markup,
    Config,
    Data,
    Docs,
    Styles,
    Scripts,
}

impl FormatCategory {
    pub const ALL: [FormatCategory; 7] = [
        FormatCategory::Code,
        FormatCategory::Markup,
        FormatCategory::Config,
        FormatCategory::Data,
        FormatCategory::Docs,
        FormatCategory::Styles,
        FormatCategory::Scripts,
    ];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FormatCategory::Code => &[
                "rs", "c", "h", "cpp", "hpp", "cc", "cs", "go", "java", "kt", "swift", "py", "rb",
                "php", "js", "jsx", "ts", "tsx", "mjs", "cjs", "scala", "lua", "dart", "zig",
                "vue", "svelte",
            ],
            FormatCategory::Markup => &["html", "htm", "xml", "svg", "xhtml"],
            FormatCategory::Config => &[
                "toml", "yaml", "yml", "ini", "cfg", "conf", "env", "properties", "lock",
            ],
            FormatCategory::Data => &["json", "csv", "tsv", "sql", "graphql", "proto"],
            FormatCategory::Docs => &["md", "markdown", "txt", "rst", "adoc", "tex"],
            FormatCategory::Styles => &["css", "scss", "sass", "less"],
            FormatCategory::Scripts => &["sh", "bash", "zsh", "fish", "ps1", "bat", "cmd"],
        }
    }
}

/// 单次构建的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Directory names skipped together with their whole subtree
    pub excluded_names: BTreeSet<String>,
    /// Extra text extensions on top of the enabled categories
    #[serde(default)]
    pub custom_extensions: Vec<String>,
    pub format_categories: BTreeSet<FormatCategory>,
    /// Bearer credential for the remote source; never serialized
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            excluded_names: ["node_modules", ".git"].iter().map(|s| s.to_string()).collect(),
            custom_extensions: vec![],
            format_categories: FormatCategory::ALL.into_iter().collect(),
            token: None,
            max_depth: None,
        }
    }
}

impl BuildOptions {
    pub fn excluding<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_names.contains(name)
    }

    /// Whether a directory at `depth` (root = 0) may still be listed.
    pub fn can_descend(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth < max)
    }

    /// Lower-cased extensions eligible for content inlining.
    pub fn text_extensions(&self) -> HashSet<String> {
        let mut exts: HashSet<String> = self
            .format_categories
            .iter()
            .flat_map(|c| c.extensions().iter().map(|e| e.to_string()))
            .collect();
        exts.extend(
            self.custom_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty()),
        );
        exts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_text_extensions() {
        let exts = BuildOptions::default().text_extensions();
        assert!(exts.contains("rs"));
        assert!(exts.contains("md"));
        assert!(!exts.contains("png"));
    }

    #[test]
    fn test_custom_extensions_are_normalized() {
        let opts = BuildOptions {
            custom_extensions: vec![".HCL".into(), " nix ".into(), ".".into()],
            format_categories: BTreeSet::new(),
            ..Default::default()
        };
        let exts = opts.text_extensions();
        assert_eq!(exts.len(), 2);
        assert!(exts.contains("hcl"));
        assert!(exts.contains("nix"));
    }

    #[test]
    fn test_depth_limit() {
        let opts = BuildOptions::default();
        assert!(opts.can_descend(1000));
        let opts = opts.with_max_depth(2);
        assert!(opts.can_descend(1));
        assert!(!opts.can_descend(2));
    }

    #[test]
    fn test_token_is_not_serialized() {
        let opts = BuildOptions::default().with_token("secret");
        let json = serde_json::to_string(&opts).unwrap();
        assert!(!json.contains("secret"));
    }
}
