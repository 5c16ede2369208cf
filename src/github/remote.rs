use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;

use crate::github::types::RepoId;

static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[/:]([^/]+/[^/]+?)(?:\.git)?/?$").expect("remote url pattern")
});

/// Extract `owner/name` from an https or ssh GitHub remote URL.
pub fn parse_remote_url(url: &str) -> Option<RepoId> {
    GITHUB_REMOTE
        .captures(url.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// Resolve the repository from the `origin` remote of the current directory.
pub async fn detect_repo_from_git_remote() -> Result<RepoId> {
    let output = tokio::process::Command::new("git")
        .args(["remote", "get-url", "origin"])
        .output()
        .await
        .context("Failed to run git")?;

    if !output.status.success() {
        anyhow::bail!("No 'origin' remote found. Pass --repo owner/name.");
    }

    let url = String::from_utf8_lossy(&output.stdout);
    parse_remote_url(&url)
        .with_context(|| format!("Remote '{}' is not a GitHub repository", url.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_and_ssh_remotes() {
        let expected: RepoId = "rust-lang/cargo".parse().unwrap();
        for url in [
            "https://github.com/rust-lang/cargo.git",
            "https://github.com/rust-lang/cargo",
            "git@github.com:rust-lang/cargo.git",
            "ssh://git@github.com/rust-lang/cargo.git\n",
            "https://github.com/rust-lang/cargo/",
        ] {
            assert_eq!(parse_remote_url(url), Some(expected.clone()), "{}", url);
        }
    }

    #[test]
    fn test_dotted_repo_name() {
        let repo = parse_remote_url("git@github.com:acme/widgets.rs.git").unwrap();
        assert_eq!(repo.name, "widgets.rs");
    }

    #[test]
    fn test_non_github_remote() {
        assert_eq!(parse_remote_url("https://gitlab.com/acme/widgets.git"), None);
        assert_eq!(parse_remote_url("not a url"), None);
    }
}
