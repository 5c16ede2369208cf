use async_trait::async_trait;

use crate::github::types::{PullRequest, RepoId};
use crate::window::TimeWindow;

/// Filters passed unchanged to every window request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchFilters {
    pub author: Option<String>,
    pub label: Option<String>,
    pub include_open: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Authentication failed. Your GitHub token may be invalid or expired.")]
    Auth,
    #[error("Repository {0} not found or no access. Check the name and token permissions (needs 'repo' scope for private repos).")]
    NotFound(RepoId),
    #[error("GitHub API rate limit exceeded. Wait a few minutes and try again.")]
    RateLimited,
    #[error("GitHub API error: {0}")]
    Api(String),
    #[error("GraphQL query failed: {0}")]
    GraphQl(String),
    #[error("Failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Fetch worker failed: {0}")]
    Worker(String),
}

/// Anything that can list pull requests created within a window.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(
        &self,
        repo: &RepoId,
        window: &TimeWindow,
        filters: &FetchFilters,
    ) -> Result<Vec<PullRequest>, FetchError>;
}

/// Build the GitHub search query for one window.
pub fn build_search_query(repo: &RepoId, window: &TimeWindow, filters: &FetchFilters) -> String {
    let mut parts = vec![format!("repo:{}", repo), "is:pr".to_string()];

    if !filters.include_open {
        parts.push("is:closed".to_string());
    }
    if let Some(author) = filters.author.as_deref().filter(|a| !a.is_empty()) {
        parts.push(format!("author:{}", author));
    }
    if let Some(label) = filters.label.as_deref().filter(|l| !l.is_empty()) {
        // Quote so labels with spaces survive
        parts.push(format!("label:\"{}\"", label.replace('"', "")));
    }
    if let Some(created) = window.search_qualifier() {
        parts.push(created);
    }

    parts.join(" ")
}
