//! Parses repository references of the form `github.com/{owner}/{repo}[/tree/{branch}][/{subpath}]`.

use once_cell::sync::Lazy;
use regex::Regex;

use repotree_common::TreeError;
use repotree_domain::SourceRef;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.)?github\.com/(?P<owner>[A-Za-z0-9_.-]+)/(?P<repo>[A-Za-z0-9_.-]+)(?:/tree/(?P<branch>[^/]+))?(?P<rest>(?:/[^/]+)*)/?$",
    )
    .expect("reference pattern is valid")
});

/// 解析仓库地址（去除首尾空白、查询串与片段）
pub fn parse_source_ref(reference: &str) -> Result<SourceRef, TreeError> {
    let trimmed = reference.trim();
    let trimmed = trimmed
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    let caps = REFERENCE
        .captures(trimmed)
        .ok_or_else(|| TreeError::InvalidInput(format!("not a repository reference: {}", reference)))?;

    let owner = caps["owner"].to_string();
    let repo = caps["repo"].trim_end_matches(".git").to_string();
    if repo.is_empty() || [".", ".."].contains(&repo.as_str()) || [".", ".."].contains(&owner.as_str()) {
        return Err(TreeError::InvalidInput(format!(
            "invalid owner or repository in: {}",
            reference
        )));
    }

    let branch = caps.name("branch").map(|m| m.as_str().to_string());
    let sub_path = caps
        .name("rest")
        .map(|m| m.as_str().trim_matches('/').to_string())
        .unwrap_or_default();

    Ok(SourceRef {
        owner,
        repo,
        branch,
        sub_path,
    })
}
