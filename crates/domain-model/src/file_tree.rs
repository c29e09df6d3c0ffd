use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// 文件树节点
///
/// `size`, `extension` and `content` are only ever set on files; `children` only on
/// directories. Use [`TreeNode::file`] and [`TreeNode::directory`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    /// Lower-cased suffix without the dot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Inlined text preview for small text files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl TreeNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let extension = extension_of(&name);
        Self {
            name,
            path: path.into(),
            kind: NodeKind::File,
            size: Some(size),
            children: None,
            extension,
            content: None,
        }
    }

    pub fn directory(name: impl Into<String>, path: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            size: None,
            children: Some(children),
            extension: None,
            content: None,
        }
    }

    pub fn with_content(mut self, content: String) -> Self {
        if self.kind == NodeKind::File {
            self.content = Some(content);
        }
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Number of file nodes in this subtree.
    pub fn file_count(&self) -> u64 {
        match self.kind {
            NodeKind::File => 1,
            NodeKind::Directory => self.children().iter().map(TreeNode::file_count).sum(),
        }
    }

    /// Sum of file sizes in this subtree.
    pub fn total_size(&self) -> u64 {
        match self.kind {
            NodeKind::File => self.size.unwrap_or(0),
            NodeKind::Directory => self.children().iter().map(TreeNode::total_size).sum(),
        }
    }

    /// Depth-first, pre-order visit of every node in the subtree, including `self`.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TreeNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        if self.path == path {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(path))
    }
}

/// Lower-cased extension of a file name; dotfiles such as `.gitignore` have none.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        TreeNode::directory(
            "repo",
            "",
            vec![
                TreeNode::directory("src", "src", vec![TreeNode::file("Main.RS", "src/Main.RS", 10)]),
                TreeNode::file("README.md", "README.md", 5),
                TreeNode::directory("empty", "empty", vec![]),
            ],
        )
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("lib.RS").as_deref(), Some("rs"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of(".gitignore"), None);
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_counts_and_find() {
        let root = sample();
        assert_eq!(root.file_count(), 2);
        assert_eq!(root.total_size(), 15);
        let main = root.find("src/Main.RS").unwrap();
        assert_eq!(main.extension.as_deref(), Some("rs"));
        assert!(root.find("missing").is_none());

        let mut names = Vec::new();
        root.walk(&mut |n| names.push(n.name.clone()));
        assert_eq!(names, vec!["repo", "src", "Main.RS", "README.md", "empty"]);
    }

    #[test]
    fn test_directory_never_gets_content() {
        let dir = TreeNode::directory("d", "d", vec![]).with_content("x".into());
        assert!(dir.content.is_none());
        assert!(dir.children().is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["kind"], "directory");
        assert!(json.get("size").is_none());
        let file = &json["children"][1];
        assert_eq!(file["kind"], "file");
        assert_eq!(file["size"], 5);
        assert!(file.get("children").is_none());
        assert_eq!(json["children"][2]["children"], serde_json::json!([]));
    }
}
