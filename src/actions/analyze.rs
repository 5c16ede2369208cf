use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{is_failure_conclusion, WorkflowJob, WorkflowRun};
use crate::stats::central::{average_duration, percentage};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunCounts {
    pub runs: usize,
    pub successes: usize,
    pub failures: usize,
}

impl RunCounts {
    fn record(&mut self, run: &WorkflowRun) {
        self.runs += 1;
        if run.is_success() {
            self.successes += 1;
        } else if run.is_failure() {
            self.failures += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        percentage(self.successes, self.runs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStats {
    #[serde(flatten)]
    pub counts: RunCounts,
    #[serde(serialize_with = "as_seconds")]
    pub average_duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub run_id: u64,
    pub workflow_name: String,
    pub display_title: String,
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "opt_as_seconds")]
    pub duration: Option<Duration>,
    pub failed_job: Option<String>,
    pub failed_step: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowAnalytics {
    #[serde(flatten)]
    pub totals: RunCounts,
    /// Mean over completed runs only
    #[serde(serialize_with = "as_seconds")]
    pub average_duration: Duration,
    pub workflows: BTreeMap<String, WorkflowStats>,
    pub events: BTreeMap<String, RunCounts>,
    pub failures: Vec<FailureDetail>,
}

fn as_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.num_milliseconds() as f64 / 1000.0)
}

fn opt_as_seconds<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => as_seconds(d, s),
        None => s.serialize_none(),
    }
}

fn completed_duration(run: &WorkflowRun) -> Option<Duration> {
    run.duration().filter(|_| run.is_completed())
}

/// Summarise a set of workflow runs. Pure; failure job details are filled in
/// separately.
pub fn analyze_workflow_runs(runs: &[WorkflowRun]) -> WorkflowAnalytics {
    let mut totals = RunCounts::default();
    let mut durations = Vec::new();
    let mut per_workflow: BTreeMap<String, (RunCounts, Vec<Duration>)> = BTreeMap::new();
    let mut events: BTreeMap<String, RunCounts> = BTreeMap::new();
    let mut failures = Vec::new();

    for run in runs {
        totals.record(run);
        events.entry(run.event.clone()).or_default().record(run);

        let (counts, workflow_durations) = per_workflow.entry(run.name.clone()).or_default();
        counts.record(run);

        if let Some(duration) = completed_duration(run) {
            durations.push(duration);
            workflow_durations.push(duration);
        }

        if run.is_failure() {
            failures.push(FailureDetail {
                run_id: run.id,
                workflow_name: run.name.clone(),
                display_title: run.display_title.clone(),
                created_at: run.created_at,
                duration: run.duration(),
                failed_job: None,
                failed_step: None,
                url: run.html_url.clone(),
            });
        }
    }

    let workflows = per_workflow
        .into_iter()
        .map(|(name, (counts, durations))| {
            let stats = WorkflowStats {
                counts,
                average_duration: average_duration(&durations),
            };
            (name, stats)
        })
        .collect();

    WorkflowAnalytics {
        totals,
        average_duration: average_duration(&durations),
        workflows,
        events,
        failures,
    }
}

/// Name of the first failed job and, within it, the first failed step
pub fn first_failure(jobs: &[WorkflowJob]) -> Option<(String, Option<String>)> {
    let job = jobs
        .iter()
        .find(|job| is_failure_conclusion(job.conclusion.as_deref()))?;
    let step = job
        .steps
        .iter()
        .find(|step| is_failure_conclusion(step.conclusion.as_deref()))
        .map(|step| step.name.clone());
    Some((job.name.clone(), step))
}
