use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use octocrab::Octocrab;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::github::search::classify_api_error;
use crate::github::source::FetchError;
use crate::github::types::{PrState, PullRequest, RepoId};

pub const DEFAULT_ENRICH_WORKERS: usize = 5;
pub const DEFAULT_ENRICH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SAMPLE_THRESHOLD: usize = 100;

const SAMPLE_HEAD: usize = 80;
const SAMPLE_MIDDLE: usize = 10;
const SAMPLE_TAIL: usize = 10;

/// Counts the code review comments on a single pull request.
#[async_trait]
pub trait ReviewCommentSource: Send + Sync {
    async fn review_comment_count(&self, repo: &RepoId, number: u64) -> Result<u64, FetchError>;
}

#[derive(Debug, Deserialize)]
struct RawReviewComment {
    in_reply_to_id: Option<u64>,
}

/// REST-backed review comment counter. Replies are not counted.
#[derive(Clone)]
pub struct OctocrabCommentSource {
    client: Octocrab,
}

impl OctocrabCommentSource {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReviewCommentSource for OctocrabCommentSource {
    async fn review_comment_count(&self, repo: &RepoId, number: u64) -> Result<u64, FetchError> {
        let route = format!("/repos/{}/{}/pulls/{}/comments", repo.owner, repo.name, number);
        let comments: Vec<RawReviewComment> = self
            .client
            .get(route, Some(&[("per_page", "100")]))
            .await
            .map_err(|e| classify_api_error(repo, e))?;

        Ok(comments.iter().filter(|c| c.in_reply_to_id.is_none()).count() as u64)
    }
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub workers: usize,
    pub timeout: Duration,
    pub sample_threshold: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_ENRICH_WORKERS,
            timeout: DEFAULT_ENRICH_TIMEOUT,
            sample_threshold: DEFAULT_SAMPLE_THRESHOLD,
        }
    }
}

/// Positions to look up out of `len` candidates.
///
/// Everything when `len <= threshold`, otherwise the first 80, ten from the
/// middle and the last ten, without duplicates and in ascending order.
pub fn sample_indices(len: usize, threshold: usize) -> Vec<usize> {
    if len <= threshold {
        return (0..len).collect();
    }

    let head = 0..SAMPLE_HEAD.min(len);
    let mid_start = len / 2;
    let middle = if mid_start + SAMPLE_MIDDLE < len {
        mid_start..mid_start + SAMPLE_MIDDLE
    } else {
        0..0
    };
    let tail = len.saturating_sub(SAMPLE_TAIL)..len;

    let mut seen = HashSet::new();
    head.chain(middle)
        .chain(tail)
        .filter(|i| seen.insert(*i))
        .collect()
}

/// Fill `review_comment_count` for merged or closed PRs.
///
/// Large lists are sampled by position before open PRs are dropped.
///
/// Lookups run with bounded concurrency and a per-call timeout. Errors and
/// timeouts leave the count at zero. Returns how many lookups succeeded.
pub async fn enrich_review_comments(
    source: Arc<dyn ReviewCommentSource>,
    repo: &RepoId,
    prs: &mut [PullRequest],
    options: &EnrichOptions,
) -> usize {
    // Sample positions in the full list, then skip PRs that are still open
    let sampled = sample_indices(prs.len(), options.sample_threshold);
    let sampled_count = sampled.len();
    let targets: Vec<(usize, u64)> = sampled
        .into_iter()
        .filter(|&idx| prs[idx].merged || prs[idx].state == PrState::Closed)
        .map(|idx| (idx, prs[idx].number))
        .collect();

    if sampled_count < prs.len() {
        log::info!(
            "Sampling review comments from {} of {} PRs",
            sampled_count,
            prs.len()
        );
    }

    let lookup = |idx: usize, number: u64| {
        let source = source.clone();
        let timeout = options.timeout;
        async move {
            let result = tokio::time::timeout(timeout, source.review_comment_count(repo, number)).await;
            (idx, number, result)
        }
    };

    let mut futures = FuturesUnordered::new();
    let mut pending = targets.into_iter();

    // Fill initial batch
    for (idx, number) in pending.by_ref().take(options.workers.max(1)) {
        futures.push(lookup(idx, number));
    }

    let mut succeeded = 0;
    while let Some((idx, number, result)) = futures.next().await {
        match result {
            Ok(Ok(count)) => {
                prs[idx].review_comment_count = count;
                succeeded += 1;
            }
            Ok(Err(e)) => log::debug!("Review comments for PR #{} unavailable: {}", number, e),
            Err(_) => log::debug!("Review comments for PR #{} timed out", number),
        }

        if let Some((idx, number)) = pending.next() {
            futures.push(lookup(idx, number));
        }
    }

    succeeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::fixtures::{days, merged_pr, open_pr};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeComments {
        counts: HashMap<u64, u64>,
        failing: HashSet<u64>,
        slow: HashSet<u64>,
        asked: Mutex<Vec<u64>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl ReviewCommentSource for FakeComments {
        async fn review_comment_count(&self, _repo: &RepoId, number: u64) -> Result<u64, FetchError> {
            self.asked.lock().unwrap().push(number);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = if self.slow.contains(&number) { 500 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&number) {
                return Err(FetchError::Api("boom".to_string()));
            }
            Ok(self.counts.get(&number).copied().unwrap_or(0))
        }
    }

    fn repo() -> RepoId {
        "acme/widgets".parse().unwrap()
    }

    #[test]
    fn test_sample_indices_below_threshold() {
        assert_eq!(sample_indices(0, 100), Vec::<usize>::new());
        assert_eq!(sample_indices(100, 100), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_indices_large() {
        let picked = sample_indices(1000, 100);
        assert_eq!(picked.len(), 100);
        assert_eq!(&picked[..80], &(0..80).collect::<Vec<_>>()[..]);
        assert_eq!(&picked[80..90], &(500..510).collect::<Vec<_>>()[..]);
        assert_eq!(&picked[90..], &(990..1000).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_sample_indices_dedup_overlap() {
        // 101 items: the middle slice 50..60 is already inside the head 0..80
        let picked = sample_indices(101, 100);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), picked.len());
        assert_eq!(picked.len(), 80 + 10);
        assert!(picked.contains(&100));
        assert!(!picked.contains(&85));
    }

    #[tokio::test]
    async fn test_only_merged_or_closed_are_looked_up() {
        let mut closed = open_pr(2);
        closed.state = PrState::Closed;
        closed.closed_at = Some(days(1));
        let mut prs = vec![merged_pr(1, days(2)), closed, open_pr(3)];

        let source = Arc::new(FakeComments {
            counts: HashMap::from([(1, 4), (2, 1), (3, 9)]),
            ..Default::default()
        });

        let ok = enrich_review_comments(source.clone(), &repo(), &mut prs, &EnrichOptions::default()).await;

        assert_eq!(ok, 2);
        assert_eq!(prs[0].review_comment_count, 4);
        assert_eq!(prs[1].review_comment_count, 1);
        assert_eq!(prs[2].review_comment_count, 0);
        let mut asked = source.asked.lock().unwrap().clone();
        asked.sort();
        assert_eq!(asked, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_errors_and_timeouts_leave_zero() {
        let mut prs = vec![merged_pr(1, days(1)), merged_pr(2, days(1)), merged_pr(3, days(1))];
        let source = Arc::new(FakeComments {
            counts: HashMap::from([(1, 3), (2, 3), (3, 3)]),
            failing: HashSet::from([2]),
            slow: HashSet::from([3]),
            ..Default::default()
        });
        let options = EnrichOptions {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };

        let ok = enrich_review_comments(source, &repo(), &mut prs, &options).await;

        assert_eq!(ok, 1);
        let counts: Vec<u64> = prs.iter().map(|pr| pr.review_comment_count).collect();
        assert_eq!(counts, vec![3, 0, 0]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mut prs: Vec<PullRequest> = (1..=20).map(|n| merged_pr(n, days(1))).collect();
        let source = Arc::new(FakeComments::default());
        let options = EnrichOptions {
            workers: 3,
            ..Default::default()
        };

        enrich_review_comments(source.clone(), &repo(), &mut prs, &options).await;

        assert_eq!(source.asked.lock().unwrap().len(), 20);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_large_sets_are_sampled() {
        let mut prs: Vec<PullRequest> = (1..=150).map(|n| merged_pr(n, days(1))).collect();
        let source = Arc::new(FakeComments::default());

        enrich_review_comments(source.clone(), &repo(), &mut prs, &EnrichOptions::default()).await;

        let asked: HashSet<u64> = source.asked.lock().unwrap().iter().copied().collect();
        // Head 1..=80, middle 76..=85 (overlapping), tail 141..=150
        assert_eq!(asked.len(), 95);
        assert!(asked.contains(&1));
        assert!(asked.contains(&85));
        assert!(asked.contains(&150));
        assert!(!asked.contains(&100));
    }

    #[tokio::test]
    async fn test_sample_is_positional_before_filtering() {
        // 110 PRs: the first 20 still open, the rest merged
        let mut prs: Vec<PullRequest> = (1..=110)
            .map(|n| if n <= 20 { open_pr(n) } else { merged_pr(n, days(1)) })
            .collect();
        let source = Arc::new(FakeComments::default());

        enrich_review_comments(source.clone(), &repo(), &mut prs, &EnrichOptions::default()).await;

        let mut asked = source.asked.lock().unwrap().clone();
        asked.sort();
        // Positions 0..80 and 100..110 are sampled; open PRs among them are skipped
        let expected: Vec<u64> = (21..=80).chain(101..=110).collect();
        assert_eq!(asked, expected);
    }
}
