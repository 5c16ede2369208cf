use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pull request lifecycle state as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrState {
    #[default]
    Open,
    Closed,
    Merged,
    #[serde(other)]
    Unknown,
}

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "OPEN",
            PrState::Closed => "CLOSED",
            PrState::Merged => "MERGED",
            PrState::Unknown => "UNKNOWN",
        }
    }
}

/// A submitted review. Pending reviews never make it into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub author: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub state: String, // "APPROVED", "CHANGES_REQUESTED", "COMMENTED", ...
}

impl Review {
    pub fn is_approval(&self) -> bool {
        self.state.eq_ignore_ascii_case("APPROVED")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: PrState,
    pub draft: bool,
    pub reopened: bool,
    pub first_reopened_at: Option<DateTime<Utc>>,
    pub base_ref: String,
    pub head_ref: String,
    pub author: Option<String>,   // None for deleted ("ghost") accounts
    pub merged_by: Option<String>,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub reviews: Vec<Review>,
    pub merge_commit: Option<String>, // merge commit oid
    pub comment_count: u64,
    pub review_comment_count: u64, // Code comments without replies, filled by enrichment

    // Derived by the normalizer
    pub merged: bool,
    #[serde(with = "lead_time_secs")]
    pub lead_time: Option<Duration>,
}

impl PullRequest {
    /// Total changed lines (additions + deletions)
    pub fn changed_lines(&self) -> u64 {
        self.additions + self.deletions
    }

    pub fn first_review_at(&self) -> Option<DateTime<Utc>> {
        self.reviews.iter().map(|r| r.submitted_at).min()
    }

    pub fn last_review_at(&self) -> Option<DateTime<Utc>> {
        self.reviews.iter().map(|r| r.submitted_at).max()
    }

    /// Submission time of the most recent approving review
    pub fn last_approval_at(&self) -> Option<DateTime<Utc>> {
        self.reviews
            .iter()
            .filter(|r| r.is_approval())
            .map(|r| r.submitted_at)
            .max()
    }
}

/// Lead time is exported as fractional hours so JSON consumers don't need a duration type.
mod lead_time_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.num_seconds() as f64 / 3600.0)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let hours: Option<f64> = Option::deserialize(d)?;
        Ok(hours.map(|h| Duration::seconds((h * 3600.0).round() as i64)))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid repository '{0}', expected 'owner/name'")]
pub struct RepoIdError(pub String);

/// Repository identifier in "owner/name" form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(RepoId {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(RepoIdError(s.to_string())),
        }
    }
}

impl TryFrom<String> for RepoId {
    type Error = RepoIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoId> for String {
    fn from(value: RepoId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// Fixed reference instant used by record fixtures across the crate
    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    pub fn days(n: i64) -> DateTime<Utc> {
        t0() + Duration::days(n)
    }

    pub fn hours(n: i64) -> DateTime<Utc> {
        t0() + Duration::hours(n)
    }

    pub fn review(author: &str, at: DateTime<Utc>, state: &str) -> Review {
        Review {
            author: Some(author.to_string()),
            submitted_at: at,
            state: state.to_string(),
        }
    }

    pub fn open_pr(number: u64) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {}", number),
            created_at: t0(),
            merged_at: None,
            closed_at: None,
            state: PrState::Open,
            draft: false,
            reopened: false,
            first_reopened_at: None,
            base_ref: "develop".to_string(),
            head_ref: format!("feature/{}", number),
            author: Some("alice".to_string()),
            merged_by: None,
            additions: 0,
            deletions: 0,
            changed_files: 0,
            reviews: vec![],
            merge_commit: None,
            comment_count: 0,
            review_comment_count: 0,
            merged: false,
            lead_time: None,
        }
    }

    /// A normalized PR created at t0 and merged at `merged_at`
    pub fn merged_pr(number: u64, merged_at: DateTime<Utc>) -> PullRequest {
        let mut pr = open_pr(number);
        pr.state = PrState::Merged;
        pr.merged_at = Some(merged_at);
        pr.closed_at = Some(merged_at);
        pr.merged_by = Some("alice".to_string());
        pr.merge_commit = Some(format!("{:040x}", number));
        pr.merged = true;
        pr.lead_time = Some(merged_at - pr.created_at);
        pr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_parse() {
        let repo: RepoId = "rust-lang/rust".parse().unwrap();
        assert_eq!(repo.owner, "rust-lang");
        assert_eq!(repo.name, "rust");
        assert_eq!(repo.to_string(), "rust-lang/rust");
    }

    #[test]
    fn test_repo_id_rejects_malformed() {
        assert!("rust".parse::<RepoId>().is_err());
        assert!("/rust".parse::<RepoId>().is_err());
        assert!("rust-lang/".parse::<RepoId>().is_err());
        assert!("a/b/c".parse::<RepoId>().is_err());
    }

    #[test]
    fn test_pr_state_deserialize_unknown() {
        let state: PrState = serde_json::from_str("\"MERGED\"").unwrap();
        assert_eq!(state, PrState::Merged);
        let state: PrState = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(state, PrState::Unknown);
    }

    #[test]
    fn test_review_accessors() {
        use fixtures::*;
        let mut pr = open_pr(1);
        pr.reviews = vec![
            review("bob", hours(5), "COMMENTED"),
            review("carol", hours(2), "approved"),
            review("dave", hours(9), "CHANGES_REQUESTED"),
        ];
        assert_eq!(pr.first_review_at(), Some(hours(2)));
        assert_eq!(pr.last_review_at(), Some(hours(9)));
        assert_eq!(pr.last_approval_at(), Some(hours(2)));
    }

    #[test]
    fn test_lead_time_serializes_as_hours() {
        let pr = fixtures::merged_pr(7, fixtures::hours(36));
        let json = serde_json::to_value(&pr).unwrap();
        assert_eq!(json["lead_time"], serde_json::json!(36.0));
        assert_eq!(json["state"], serde_json::json!("MERGED"));
    }
}
