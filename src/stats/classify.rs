//! Heuristic classification of individual pull requests.

use serde::Serialize;

use crate::github::types::{PrState, PullRequest};

/// How a merged PR landed, guessed from whether it left a merge commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MergeType {
    MergeOrSquash,
    RebaseOrOther,
}

impl MergeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeType::MergeOrSquash => "merge/squash",
            MergeType::RebaseOrOther => "rebase/other",
        }
    }
}

/// `main` or `master`, case-insensitive
pub fn is_release_branch(base_ref: &str) -> bool {
    base_ref.eq_ignore_ascii_case("main") || base_ref.eq_ignore_ascii_case("master")
}

pub fn is_hotfix_branch(head_ref: &str) -> bool {
    head_ref.to_lowercase().starts_with("hotfix")
}

/// Merged into a release branch
pub fn is_release(pr: &PullRequest) -> bool {
    pr.merged && is_release_branch(&pr.base_ref)
}

pub fn is_hotfix(pr: &PullRequest) -> bool {
    pr.merged && is_hotfix_branch(&pr.head_ref)
}

pub fn is_revert_like(pr: &PullRequest) -> bool {
    pr.merged && pr.title.to_lowercase().contains("revert")
}

/// None for PRs that were not merged
pub fn merge_type(pr: &PullRequest) -> Option<MergeType> {
    if !pr.merged {
        return None;
    }
    match pr.merge_commit.as_deref() {
        Some(oid) if !oid.is_empty() => Some(MergeType::MergeOrSquash),
        _ => Some(MergeType::RebaseOrOther),
    }
}

/// Merged by its own author. Deleted accounts never count.
pub fn is_self_merge(pr: &PullRequest) -> bool {
    pr.merged && pr.author.is_some() && pr.author == pr.merged_by
}

/// Drafts into a release branch, other than hotfixes, only start waiting for
/// merge once they are ready for review.
pub fn waits_for_ready(pr: &PullRequest) -> bool {
    is_release_branch(&pr.base_ref) && pr.draft && !is_hotfix_branch(&pr.head_ref)
}

/// Open draft
pub fn is_wip(pr: &PullRequest) -> bool {
    pr.state == PrState::Open && pr.draft
}
