use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::central::{percentage, CountStat, DurationStat};
use super::classify;
use super::hotfix::match_hotfixes;
use crate::github::types::PullRequest;

/// Assumed commits per PR when turning the PR arrival rate into a commit rate
pub const ESTIMATED_COMMITS_PER_PR: f64 = 3.5;

/// Review gaps of a week or more are treated as abandoned, not as response time
const MAX_REVIEW_RESPONSE: i64 = 7;

/// Snapshot of every metric derived from one set of normalized PRs.
///
/// Durations serialize as fractional hours. Rates are percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_prs: usize,
    pub merged_prs: usize,
    pub wip_prs: usize,
    pub merge_rate: f64,

    pub avg_files_changed: f64,
    pub avg_additions: f64,
    pub avg_deletions: f64,

    pub lead_time: DurationStat,
    pub review_time: DurationStat,
    pub merge_wait_time: DurationStat,
    pub approval_to_merge: DurationStat,
    pub review_response_time: DurationStat,
    pub prs_with_reviews: usize,
    pub avg_reviewers_per_pr: f64,

    pub self_merge_rate: f64,
    pub merge_type_trend: BTreeMap<String, f64>,
    pub revert_like_merges: usize,

    pub reopened_prs: usize,
    pub reopen_rate: f64,
    pub reopen_to_merge: DurationStat,

    pub release_count: usize,
    pub hotfix_merges: usize,
    pub hotfix_after_release: DurationStat,
    pub hotfix_without_release: usize,

    pub comments: CountStat,
    pub prs_with_comments: usize,
    pub prs_without_comments: usize,
    /// Conversation comments per 100 changed lines
    pub comment_density: f64,

    pub review_comments: CountStat,
    pub prs_with_review_comments: usize,
    pub prs_without_review_comments: usize,
    /// Review comments per 100 changed lines
    pub review_comment_density: f64,

    /// Approximation from the PR arrival rate, not measured commit data
    pub estimated_commits_per_week: f64,
}

/// Mean gap between consecutive reviews, ignoring gaps outside `(0, 7d)`
fn review_response_time(pr: &PullRequest) -> Option<Duration> {
    let mut times: Vec<DateTime<Utc>> = pr.reviews.iter().map(|r| r.submitted_at).collect();
    times.sort();

    let limit = Duration::days(MAX_REVIEW_RESPONSE);
    let gaps: Vec<Duration> = times
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|gap| *gap > Duration::zero() && *gap < limit)
        .collect();

    (!gaps.is_empty()).then(|| super::central::average_duration(&gaps))
}

/// Start of the merge wait: the last review, pushed back to when the PR was
/// ready for drafts that were held until then.
fn merge_wait_start(pr: &PullRequest, merged_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let last_review = pr.last_review_at()?;
    if classify::waits_for_ready(pr) {
        let ready = pr.first_review_at().unwrap_or(merged_at);
        return Some(last_review.max(ready));
    }
    Some(last_review)
}

/// PR arrival rate over the created-at span, scaled to an estimated commit rate.
fn estimated_commits_per_week(prs: &[PullRequest]) -> f64 {
    let earliest = prs.iter().map(|pr| pr.created_at).min();
    let latest = prs.iter().map(|pr| pr.created_at).max();
    let (Some(earliest), Some(latest)) = (earliest, latest) else {
        return 0.0;
    };

    let weeks = (latest - earliest).num_seconds() as f64 / Duration::weeks(1).num_seconds() as f64;
    if weeks <= 0.0 {
        return 0.0;
    }
    prs.len() as f64 / weeks * ESTIMATED_COMMITS_PER_PR
}

fn per_hundred_lines(count: u64, lines: u64) -> f64 {
    if lines == 0 {
        return 0.0;
    }
    count as f64 / lines as f64 * 100.0
}

/// Compute every aggregate metric over `prs`. Never fails; empty input gives
/// an all-zero snapshot.
pub fn calculate_stats(prs: &[PullRequest]) -> AggregateStats {
    let total = prs.len();
    let n = total.max(1) as f64;

    let mut lead_times = Vec::new();
    let mut review_times = Vec::new();
    let mut merge_waits = Vec::new();
    let mut approval_waits = Vec::new();
    let mut reopen_waits = Vec::new();
    let mut response_times = Vec::new();
    let mut release_times = Vec::new();
    let mut hotfix_times = Vec::new();
    let mut merge_types: BTreeMap<&'static str, usize> = BTreeMap::new();

    let mut merged = 0;
    let mut wip = 0;
    let mut self_merged = 0;
    let mut reverts = 0;
    let mut reopened = 0;
    let mut files = 0u64;
    let mut additions = 0u64;
    let mut deletions = 0u64;
    let mut reviewers = 0usize;
    let mut comment_counts = Vec::with_capacity(total);
    let mut review_comment_counts = Vec::with_capacity(total);

    for pr in prs {
        files += pr.changed_files;
        additions += pr.additions;
        deletions += pr.deletions;
        comment_counts.push(pr.comment_count);
        review_comment_counts.push(pr.review_comment_count);

        let distinct: HashSet<Option<&str>> = pr.reviews.iter().map(|r| r.author.as_deref()).collect();
        reviewers += distinct.len();

        if classify::is_wip(pr) {
            wip += 1;
        }
        if pr.reopened {
            reopened += 1;
        }

        if let Some(first_review) = pr.first_review_at() {
            let wait = first_review - pr.created_at;
            if wait > Duration::zero() {
                review_times.push(wait);
            }
        }
        if let Some(response) = review_response_time(pr) {
            response_times.push(response);
        }

        let merged_at = match pr.merged_at {
            Some(at) if pr.merged => at,
            _ => continue,
        };
        merged += 1;

        if let Some(lead_time) = pr.lead_time {
            lead_times.push(lead_time);
        }
        if let Some(start) = merge_wait_start(pr, merged_at) {
            if merged_at > start {
                merge_waits.push(merged_at - start);
            }
        }
        if let Some(approved_at) = pr.last_approval_at() {
            if merged_at > approved_at {
                approval_waits.push(merged_at - approved_at);
            }
        }
        if let Some(reopened_at) = pr.first_reopened_at.filter(|_| pr.reopened) {
            if merged_at > reopened_at {
                reopen_waits.push(merged_at - reopened_at);
            }
        }

        if classify::is_self_merge(pr) {
            self_merged += 1;
        }
        if let Some(kind) = classify::merge_type(pr) {
            *merge_types.entry(kind.as_str()).or_default() += 1;
        }
        if classify::is_revert_like(pr) {
            reverts += 1;
        }
        if classify::is_release(pr) {
            release_times.push(merged_at);
        }
        if classify::is_hotfix(pr) {
            hotfix_times.push(merged_at);
        }
    }

    let release_count = release_times.len();
    let hotfix_merges = hotfix_times.len();
    let hotfixes = match_hotfixes(release_times, &hotfix_times);

    let changed_lines = additions + deletions;
    let comments = CountStat::from_samples(comment_counts);
    let review_comments = CountStat::from_samples(review_comment_counts);
    let prs_with_comments = prs.iter().filter(|pr| pr.comment_count > 0).count();
    let prs_with_review_comments = prs.iter().filter(|pr| pr.review_comment_count > 0).count();

    AggregateStats {
        total_prs: total,
        merged_prs: merged,
        wip_prs: wip,
        merge_rate: percentage(merged, total),

        avg_files_changed: files as f64 / n,
        avg_additions: additions as f64 / n,
        avg_deletions: deletions as f64 / n,

        lead_time: DurationStat::from_samples(lead_times),
        prs_with_reviews: review_times.len(),
        review_time: DurationStat::from_samples(review_times),
        merge_wait_time: DurationStat::from_samples(merge_waits),
        approval_to_merge: DurationStat::from_samples(approval_waits),
        review_response_time: DurationStat::from_samples(response_times),
        avg_reviewers_per_pr: reviewers as f64 / n,

        self_merge_rate: percentage(self_merged, merged),
        merge_type_trend: merge_types
            .into_iter()
            .map(|(kind, count)| (kind.to_string(), percentage(count, merged)))
            .collect(),
        revert_like_merges: reverts,

        reopened_prs: reopened,
        reopen_rate: percentage(reopened, total),
        reopen_to_merge: DurationStat::from_samples(reopen_waits),

        release_count,
        hotfix_merges,
        hotfix_after_release: DurationStat::from_samples(hotfixes.gaps),
        hotfix_without_release: hotfixes.without_release,

        comment_density: per_hundred_lines(comments.total, changed_lines),
        comments,
        prs_with_comments,
        prs_without_comments: total - prs_with_comments,

        review_comment_density: per_hundred_lines(review_comments.total, changed_lines),
        review_comments,
        prs_with_review_comments,
        prs_without_review_comments: total - prs_with_review_comments,

        estimated_commits_per_week: estimated_commits_per_week(prs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::fixtures::*;
    use crate::github::types::PrState;

    #[test]
    fn test_empty_input_is_all_zero() {
        assert_eq!(calculate_stats(&[]), AggregateStats::default());
    }

    #[test]
    fn test_lead_time_over_merged_only() {
        let mut closed = open_pr(3);
        closed.state = PrState::Closed;
        closed.closed_at = Some(hours(100));
        closed.lead_time = Some(Duration::hours(100));

        let prs = vec![merged_pr(1, hours(10)), merged_pr(2, hours(20)), closed, open_pr(4)];
        let stats = calculate_stats(&prs);

        assert_eq!(stats.total_prs, 4);
        assert_eq!(stats.merged_prs, 2);
        assert_eq!(stats.merge_rate, 50.0);
        assert_eq!(stats.lead_time.average, Duration::hours(15));
        assert_eq!(stats.lead_time.median, Duration::hours(15));
        assert_eq!(stats.lead_time.samples, 2);
    }

    #[test]
    fn test_self_merge_rate_exact() {
        let prs: Vec<PullRequest> = (1..=10)
            .map(|n| {
                let mut pr = merged_pr(n, days(1));
                if n > 3 {
                    pr.merged_by = Some("maintainer".to_string());
                }
                pr
            })
            .collect();

        assert_eq!(calculate_stats(&prs).self_merge_rate, 30.0);
    }

    #[test]
    fn test_merge_wait_for_draft_into_main() {
        let mut pr = merged_pr(1, days(5));
        pr.base_ref = "main".to_string();
        pr.draft = true;
        pr.reviews = vec![review("bob", days(2), "APPROVED"), review("carol", days(1), "COMMENTED")];

        let stats = calculate_stats(&[pr]);
        assert_eq!(stats.merge_wait_time.average, Duration::days(3));
        assert_eq!(stats.merge_wait_time.samples, 1);
    }

    #[test]
    fn test_merge_wait_averages_over_samples() {
        let mut reviewed = merged_pr(1, days(4));
        reviewed.reviews = vec![review("bob", days(1), "APPROVED")];
        let unreviewed = merged_pr(2, days(4));

        let stats = calculate_stats(&[reviewed, unreviewed]);
        assert_eq!(stats.merge_wait_time.average, Duration::days(3));
        assert_eq!(stats.approval_to_merge.average, Duration::days(3));
    }

    #[test]
    fn test_review_time_positive_only() {
        let mut a = open_pr(1);
        a.reviews = vec![review("bob", hours(4), "COMMENTED")];
        let mut b = open_pr(2);
        b.reviews = vec![review("bob", hours(-1), "COMMENTED")];

        let stats = calculate_stats(&[a, b, open_pr(3)]);
        assert_eq!(stats.review_time.samples, 1);
        assert_eq!(stats.review_time.average, Duration::hours(4));
        assert_eq!(stats.prs_with_reviews, 1);
    }

    #[test]
    fn test_approval_uses_latest_approval() {
        let mut pr = merged_pr(1, hours(10));
        pr.reviews = vec![
            review("bob", hours(2), "APPROVED"),
            review("carol", hours(6), "APPROVED"),
            review("dave", hours(8), "COMMENTED"),
        ];
        let stats = calculate_stats(&[pr]);
        assert_eq!(stats.approval_to_merge.average, Duration::hours(4));
        assert_eq!(stats.merge_wait_time.average, Duration::hours(2));
    }

    #[test]
    fn test_hotfix_release_matching() {
        let release = |n, at| {
            let mut pr = merged_pr(n, at);
            pr.base_ref = "main".to_string();
            pr
        };
        let hotfix = |n, at| {
            let mut pr = merged_pr(n, at);
            pr.head_ref = "hotfix/urgent".to_string();
            pr
        };

        let prs = vec![
            release(1, days(0)),
            release(2, days(10)),
            hotfix(3, days(15)),
            hotfix(4, days(-1)),
        ];
        let stats = calculate_stats(&prs);

        assert_eq!(stats.release_count, 2);
        assert_eq!(stats.hotfix_merges, 2);
        assert_eq!(stats.hotfix_without_release, 1);
        assert_eq!(stats.hotfix_after_release.samples, 1);
        assert_eq!(stats.hotfix_after_release.average, Duration::days(5));
    }

    #[test]
    fn test_merge_type_trend_and_reverts() {
        let mut rebased = merged_pr(2, days(1));
        rebased.merge_commit = None;
        rebased.title = "Revert widget change".to_string();

        let prs = vec![merged_pr(1, days(1)), rebased, merged_pr(3, days(1)), merged_pr(4, days(1))];
        let stats = calculate_stats(&prs);

        assert_eq!(stats.merge_type_trend.get("merge/squash"), Some(&75.0));
        assert_eq!(stats.merge_type_trend.get("rebase/other"), Some(&25.0));
        assert_eq!(stats.revert_like_merges, 1);
    }

    #[test]
    fn test_reopen_metrics() {
        let mut reopened_merged = merged_pr(1, days(6));
        reopened_merged.reopened = true;
        reopened_merged.first_reopened_at = Some(days(2));
        let mut reopened_open = open_pr(2);
        reopened_open.reopened = true;
        reopened_open.first_reopened_at = Some(days(1));

        let stats = calculate_stats(&[reopened_merged, reopened_open, open_pr(3), open_pr(4)]);
        assert_eq!(stats.reopened_prs, 2);
        assert_eq!(stats.reopen_rate, 50.0);
        assert_eq!(stats.reopen_to_merge.samples, 1);
        assert_eq!(stats.reopen_to_merge.average, Duration::days(4));
    }

    #[test]
    fn test_size_reviewers_and_wip() {
        let mut a = open_pr(1);
        a.draft = true;
        a.additions = 30;
        a.deletions = 10;
        a.changed_files = 3;
        a.reviews = vec![
            review("bob", hours(1), "COMMENTED"),
            review("bob", hours(2), "APPROVED"),
            review("carol", hours(3), "APPROVED"),
        ];
        let mut b = merged_pr(2, days(1));
        b.draft = true;
        b.additions = 10;
        b.changed_files = 1;

        let stats = calculate_stats(&[a, b]);
        assert_eq!(stats.wip_prs, 1);
        assert_eq!(stats.avg_files_changed, 2.0);
        assert_eq!(stats.avg_additions, 20.0);
        assert_eq!(stats.avg_deletions, 5.0);
        assert_eq!(stats.avg_reviewers_per_pr, 1.0);
    }

    #[test]
    fn test_review_response_time_ignores_long_gaps() {
        let mut pr = open_pr(1);
        pr.reviews = vec![
            review("bob", hours(0), "COMMENTED"),
            review("carol", hours(2), "COMMENTED"),
            review("dave", hours(6), "COMMENTED"),
            review("erin", days(20), "APPROVED"),
        ];
        let stats = calculate_stats(&[pr]);
        assert_eq!(stats.review_response_time.samples, 1);
        assert_eq!(stats.review_response_time.average, Duration::hours(3));
    }

    #[test]
    fn test_comment_metrics() {
        let mut a = open_pr(1);
        a.comment_count = 4;
        a.review_comment_count = 2;
        a.additions = 150;
        a.deletions = 50;
        let mut b = open_pr(2);
        b.comment_count = 0;
        let mut c = open_pr(3);
        c.comment_count = 2;

        let stats = calculate_stats(&[a, b, c]);
        assert_eq!(stats.comments.total, 6);
        assert_eq!(stats.comments.average, 2.0);
        assert_eq!(stats.comments.median, 2.0);
        assert_eq!(stats.comments.max, 4);
        assert_eq!(stats.prs_with_comments, 2);
        assert_eq!(stats.prs_without_comments, 1);
        assert_eq!(stats.comment_density, 3.0);

        assert_eq!(stats.prs_with_review_comments, 1);
        assert_eq!(stats.prs_without_review_comments, 2);
        assert_eq!(stats.review_comments.max, 2);
        assert_eq!(stats.review_comment_density, 1.0);
    }

    #[test]
    fn test_commit_frequency_estimate() {
        let mut a = open_pr(1);
        a.created_at = days(0);
        let mut b = open_pr(2);
        b.created_at = days(14);

        let stats = calculate_stats(&[a, b]);
        // 2 PRs over 2 weeks at 3.5 commits each
        assert!((stats.estimated_commits_per_week - 3.5).abs() < 1e-9);

        // All created at the same instant: no span, no estimate
        assert_eq!(calculate_stats(&[open_pr(1), open_pr(2)]).estimated_commits_per_week, 0.0);
    }
}
