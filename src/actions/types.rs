use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One GitHub Actions workflow run, as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkflowRun {
    pub id: u64,
    /// Workflow name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_title: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub status: String,
    pub conclusion: Option<String>,
    pub head_branch: Option<String>,
    #[serde(default)]
    pub run_attempt: u32,
    pub created_at: DateTime<Utc>,
    pub run_started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: String,
}

impl WorkflowRun {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn is_success(&self) -> bool {
        self.conclusion.as_deref() == Some("success")
    }

    pub fn is_failure(&self) -> bool {
        is_failure_conclusion(self.conclusion.as_deref())
    }

    /// `updated_at - run_started_at` when both are known
    pub fn duration(&self) -> Option<Duration> {
        Some(self.updated_at? - self.run_started_at?)
    }
}

/// Conclusions counted as failures: failure, cancelled and timed_out
pub fn is_failure_conclusion(conclusion: Option<&str>) -> bool {
    matches!(conclusion, Some("failure" | "cancelled" | "timed_out"))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowJob {
    pub name: String,
    pub conclusion: Option<String>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunsPage {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobsPage {
    #[serde(default)]
    pub jobs: Vec<WorkflowJob>,
}
