use crate::github::types::{PrState, PullRequest};

/// Derive `merged` and `lead_time` and order reviews chronologically.
///
/// Applying this twice gives the same records as applying it once.
pub fn normalize(prs: Vec<PullRequest>) -> Vec<PullRequest> {
    prs.into_iter().map(normalize_pr).collect()
}

pub fn normalize_pr(mut pr: PullRequest) -> PullRequest {
    pr.merged = pr.state == PrState::Merged && pr.merged_at.is_some();

    let finished_at = if pr.merged { pr.merged_at } else { pr.closed_at };
    pr.lead_time = finished_at.map(|at| at - pr.created_at);

    // Stable: reviews submitted at the same instant keep their fetch order
    pr.reviews.sort_by_key(|r| r.submitted_at);
    pr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::fixtures::*;
    use chrono::Duration;

    #[test]
    fn test_merged_lead_time() {
        let mut pr = open_pr(1);
        pr.state = PrState::Merged;
        pr.merged_at = Some(hours(30));
        pr.closed_at = Some(hours(31));

        let pr = normalize_pr(pr);
        assert!(pr.merged);
        assert_eq!(pr.lead_time, Some(Duration::hours(30)));
    }

    #[test]
    fn test_closed_unmerged_lead_time() {
        let mut pr = open_pr(1);
        pr.state = PrState::Closed;
        pr.closed_at = Some(days(3));

        let pr = normalize_pr(pr);
        assert!(!pr.merged);
        assert_eq!(pr.lead_time, Some(Duration::days(3)));
    }

    #[test]
    fn test_open_kept_without_lead_time() {
        let prs = normalize(vec![open_pr(1), open_pr(2)]);
        assert_eq!(prs.len(), 2);
        assert!(prs.iter().all(|pr| !pr.merged && pr.lead_time.is_none()));
    }

    #[test]
    fn test_merged_state_without_timestamp_is_not_merged() {
        let mut pr = open_pr(1);
        pr.state = PrState::Merged;
        pr.closed_at = Some(days(1));

        let pr = normalize_pr(pr);
        assert!(!pr.merged);
        assert_eq!(pr.lead_time, Some(Duration::days(1)));
    }

    #[test]
    fn test_stale_derived_fields_are_overwritten() {
        let mut pr = open_pr(1);
        pr.merged = true;
        pr.lead_time = Some(Duration::days(99));

        let pr = normalize_pr(pr);
        assert!(!pr.merged);
        assert_eq!(pr.lead_time, None);
    }

    #[test]
    fn test_reviews_sorted_stably() {
        let mut pr = open_pr(1);
        pr.reviews = vec![
            review("carol", hours(5), "APPROVED"),
            review("bob", hours(2), "COMMENTED"),
            review("dave", hours(2), "CHANGES_REQUESTED"),
        ];

        let pr = normalize_pr(pr);
        let order: Vec<_> = pr.reviews.iter().map(|r| r.author.as_deref().unwrap()).collect();
        assert_eq!(order, vec!["bob", "dave", "carol"]);
    }

    #[test]
    fn test_order_preserved_and_idempotent() {
        let mut closed = open_pr(2);
        closed.state = PrState::Closed;
        closed.closed_at = Some(days(2));
        let mut merged = open_pr(3);
        merged.state = PrState::Merged;
        merged.merged_at = Some(days(1));
        merged.reviews = vec![review("x", hours(9), "APPROVED"), review("y", hours(1), "COMMENTED")];

        let once = normalize(vec![open_pr(1), closed, merged]);
        let numbers: Vec<u64> = once.iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }
}
