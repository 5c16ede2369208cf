use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::json;
use tokio_retry::{strategy::ExponentialBackoff, Retry};

use crate::github::source::{build_search_query, FetchError, FetchFilters, RecordSource};
use crate::github::types::{PrState, PullRequest, RepoId, Review};
use crate::window::TimeWindow;

/// GitHub search never returns more than 1000 results per query
pub const DEFAULT_PAGE_LIMIT: usize = 1000;
const PAGE_SIZE: usize = 100;

const SEARCH_QUERY: &str = r#"
query($q: String!, $first: Int!, $after: String) {
  search(query: $q, type: ISSUE, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        number
        title
        createdAt
        mergedAt
        closedAt
        state
        isDraft
        baseRefName
        headRefName
        author { login }
        mergedBy { login }
        additions
        deletions
        changedFiles
        mergeCommit { oid }
        comments { totalCount }
        reviews(first: 100) { nodes { author { login } submittedAt state } }
        timelineItems(itemTypes: [REOPENED_EVENT], first: 1) {
          totalCount
          nodes { ... on ReopenedEvent { createdAt } }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<RawPullRequest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Oid {
    oid: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReview {
    author: Option<Actor>,
    submitted_at: Option<DateTime<Utc>>,
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Timeline {
    total_count: u64,
    #[serde(default)]
    nodes: Vec<Option<ReopenedEvent>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReopenedEvent {
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequest {
    number: u64,
    title: String,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    state: PrState,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    base_ref_name: String,
    #[serde(default)]
    head_ref_name: String,
    author: Option<Actor>,
    merged_by: Option<Actor>,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    changed_files: u64,
    merge_commit: Option<Oid>,
    #[serde(default)]
    comments: TotalCount,
    reviews: Option<Nodes<RawReview>>,
    timeline_items: Option<Timeline>,
}

impl From<RawPullRequest> for PullRequest {
    fn from(raw: RawPullRequest) -> Self {
        // Pending reviews have no submission time and are not part of the history
        let reviews = raw
            .reviews
            .map(|r| r.nodes)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|review| {
                Some(Review {
                    author: review.author.map(|a| a.login),
                    submitted_at: review.submitted_at?,
                    state: review.state,
                })
            })
            .collect();

        let (reopened, first_reopened_at) = match raw.timeline_items {
            Some(timeline) if timeline.total_count > 0 => (
                true,
                timeline.nodes.into_iter().flatten().find_map(|e| e.created_at),
            ),
            _ => (false, None),
        };

        PullRequest {
            number: raw.number,
            title: raw.title,
            created_at: raw.created_at,
            merged_at: raw.merged_at,
            closed_at: raw.closed_at,
            state: raw.state,
            draft: raw.is_draft,
            reopened,
            first_reopened_at,
            base_ref: raw.base_ref_name,
            head_ref: raw.head_ref_name,
            author: raw.author.map(|a| a.login),
            merged_by: raw.merged_by.map(|a| a.login),
            additions: raw.additions,
            deletions: raw.deletions,
            changed_files: raw.changed_files,
            reviews,
            merge_commit: raw.merge_commit.map(|c| c.oid).filter(|oid| !oid.is_empty()),
            comment_count: raw.comments.total_count,
            review_comment_count: 0,
            merged: false,
            lead_time: None,
        }
    }
}

/// Translate an octocrab error into something a user can act on
pub(crate) fn classify_api_error(repo: &RepoId, e: octocrab::Error) -> FetchError {
    let error_str = format!("{:?}", e);
    if error_str.contains("do not have permission") || error_str.contains("resources do not exist") {
        FetchError::NotFound(repo.clone())
    } else if error_str.contains("401") || error_str.contains("Bad credentials") {
        FetchError::Auth
    } else if error_str.contains("rate limit") || error_str.contains("403") {
        FetchError::RateLimited
    } else {
        FetchError::Api(e.to_string())
    }
}

/// Record source backed by the GitHub GraphQL search API.
#[derive(Clone)]
pub struct OctocrabSource {
    client: Octocrab,
    page_limit: usize,
}

impl OctocrabSource {
    pub fn new(client: Octocrab, page_limit: usize) -> Self {
        Self { client, page_limit }
    }

    async fn fetch_page(
        &self,
        repo: &RepoId,
        query: &str,
        after: Option<&str>,
    ) -> Result<SearchConnection, FetchError> {
        // Retry strategy: exponential backoff with 3 attempts
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(std::time::Duration::from_secs(5))
            .take(3);

        let payload = json!({
            "query": SEARCH_QUERY,
            "variables": { "q": query, "first": PAGE_SIZE, "after": after },
        });

        let value: serde_json::Value = Retry::spawn(retry_strategy, || async {
            self.client
                .graphql::<serde_json::Value>(&payload)
                .await
                .map_err(|e| classify_api_error(repo, e))
        })
        .await?;

        parse_search_response(repo, value)
    }
}

fn parse_search_response(repo: &RepoId, value: serde_json::Value) -> Result<SearchConnection, FetchError> {
    let response: SearchResponse = serde_json::from_value(value)?;

    if let Some(error) = response.errors.first() {
        return Err(match error.kind.as_deref() {
            Some("NOT_FOUND") => FetchError::NotFound(repo.clone()),
            Some("RATE_LIMITED") => FetchError::RateLimited,
            _ => FetchError::GraphQl(error.message.clone()),
        });
    }

    response
        .data
        .map(|d| d.search)
        .ok_or_else(|| FetchError::GraphQl("response contained no data".to_string()))
}

#[async_trait]
impl RecordSource for OctocrabSource {
    async fn fetch(
        &self,
        repo: &RepoId,
        window: &TimeWindow,
        filters: &FetchFilters,
    ) -> Result<Vec<PullRequest>, FetchError> {
        let query = build_search_query(repo, window, filters);
        log::debug!("Searching: {}", query);

        let mut prs = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.fetch_page(repo, &query, cursor.as_deref()).await?;
            prs.extend(page.nodes.into_iter().flatten().map(PullRequest::from));

            if !page.page_info.has_next_page || prs.len() >= self.page_limit {
                break;
            }
            cursor = page.page_info.end_cursor;
            if cursor.is_none() {
                break;
            }
        }

        prs.truncate(self.page_limit);
        Ok(prs)
    }
}
