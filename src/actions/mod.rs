//! GitHub Actions workflow run analysis.

pub mod analyze;
pub mod fetch;
pub mod types;

pub use analyze::{analyze_workflow_runs, FailureDetail, RunCounts, WorkflowAnalytics, WorkflowStats};
pub use fetch::{attach_failure_jobs, ActionsSource, OctocrabActions};
pub use types::WorkflowRun;
