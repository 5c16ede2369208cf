use async_trait::async_trait;
use futures::future::join_all;
use octocrab::Octocrab;

use super::analyze::{first_failure, FailureDetail};
use super::types::{JobsPage, RunsPage, WorkflowJob, WorkflowRun};
use crate::github::search::classify_api_error;
use crate::github::source::FetchError;
use crate::github::types::RepoId;
use crate::window::TimeWindow;

pub const MAX_RUNS: usize = 500;
const RUNS_PER_PAGE: usize = 100;

/// Failures looked up for job and step details
pub const FAILURE_DETAIL_LIMIT: usize = 5;

#[async_trait]
pub trait ActionsSource: Send + Sync {
    async fn list_runs(&self, repo: &RepoId, window: &TimeWindow) -> Result<Vec<WorkflowRun>, FetchError>;

    async fn list_jobs(&self, repo: &RepoId, run_id: u64) -> Result<Vec<WorkflowJob>, FetchError>;
}

#[derive(Clone)]
pub struct OctocrabActions {
    client: Octocrab,
}

impl OctocrabActions {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

/// Value for the REST `created` filter, e.g. `2024-01-01..2024-01-31`
fn created_filter(window: &TimeWindow) -> Option<String> {
    window
        .search_qualifier()
        .and_then(|q| q.strip_prefix("created:").map(str::to_string))
}

#[async_trait]
impl ActionsSource for OctocrabActions {
    async fn list_runs(&self, repo: &RepoId, window: &TimeWindow) -> Result<Vec<WorkflowRun>, FetchError> {
        let route = format!("/repos/{}/{}/actions/runs", repo.owner, repo.name);
        let created = created_filter(window);
        let mut runs = Vec::new();

        for page in 1..=MAX_RUNS.div_ceil(RUNS_PER_PAGE) {
            let mut params = vec![
                ("per_page", RUNS_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            if let Some(ref created) = created {
                params.push(("created", created.clone()));
            }

            let response: RunsPage = self
                .client
                .get(&route, Some(&params))
                .await
                .map_err(|e| classify_api_error(repo, e))?;

            let fetched = response.workflow_runs.len();
            runs.extend(response.workflow_runs);
            if fetched < RUNS_PER_PAGE {
                break;
            }
        }

        runs.truncate(MAX_RUNS);
        Ok(runs)
    }

    async fn list_jobs(&self, repo: &RepoId, run_id: u64) -> Result<Vec<WorkflowJob>, FetchError> {
        let route = format!("/repos/{}/{}/actions/runs/{}/jobs", repo.owner, repo.name, run_id);
        let response: JobsPage = self
            .client
            .get(route, None::<&()>)
            .await
            .map_err(|e| classify_api_error(repo, e))?;
        Ok(response.jobs)
    }
}

/// Fill in failed job and step names for the first few failures.
/// Lookup errors leave the detail as it was.
pub async fn attach_failure_jobs(source: &dyn ActionsSource, repo: &RepoId, failures: &mut [FailureDetail]) {
    let limit = failures.len().min(FAILURE_DETAIL_LIMIT);
    let lookups = failures[..limit]
        .iter()
        .map(|failure| source.list_jobs(repo, failure.run_id));
    let results = join_all(lookups).await;

    for (failure, result) in failures.iter_mut().zip(results) {
        match result {
            Ok(jobs) => {
                if let Some((job, step)) = first_failure(&jobs) {
                    failure.failed_job = Some(job);
                    failure.failed_step = step;
                }
            }
            Err(e) => log::debug!("Job details for run {} unavailable: {}", failure.run_id, e),
        }
    }
}
