use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::github::source::{FetchError, FetchFilters, RecordSource};
use crate::github::types::{PullRequest, RepoId};
use crate::window::TimeWindow;

/// Number of windows fetched concurrently
pub const DEFAULT_WORKERS: usize = 5;

/// Receives progress signals from the orchestrator. Purely observational.
pub trait FetchObserver: Send + Sync {
    fn fetch_started(&self, _windows: usize, _workers: usize) {}
    fn window_fetched(&self, _window: &TimeWindow, _records: usize) {}
    fn fetch_finished(&self, _total: usize) {}
}

/// Reports progress through the `log` facade
pub struct LogObserver;

impl FetchObserver for LogObserver {
    fn fetch_started(&self, windows: usize, workers: usize) {
        if windows > 1 {
            log::info!("Fetching PRs in parallel ({} chunks, {} workers)", windows, workers);
        } else {
            log::info!("Fetching PRs");
        }
    }

    fn window_fetched(&self, window: &TimeWindow, records: usize) {
        log::info!("Fetched {} PRs for {}", records, window);
    }

    fn fetch_finished(&self, total: usize) {
        log::info!("Total PRs fetched: {}", total);
    }
}

type Outcome = (TimeWindow, Result<Vec<PullRequest>, FetchError>);

/// Fans window fetches out over a fixed pool of workers and merges the results.
///
/// Any failed window fails the whole call with the first error received. Records
/// from windows that succeeded are dropped in that case, and in-flight peers are
/// left to finish rather than cancelled.
pub struct FetchOrchestrator {
    source: Arc<dyn RecordSource>,
    workers: usize,
    observer: Arc<dyn FetchObserver>,
}

impl FetchOrchestrator {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            workers: DEFAULT_WORKERS,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn fetch_all(
        &self,
        repo: &RepoId,
        windows: Vec<TimeWindow>,
        filters: &FetchFilters,
    ) -> Result<Vec<PullRequest>, FetchError> {
        if windows.len() <= 1 {
            let window = windows.into_iter().next().unwrap_or_else(TimeWindow::unbounded);
            return self.fetch_single(repo, window, filters).await;
        }

        self.observer.fetch_started(windows.len(), self.workers);

        // Job queue is filled up front and closed, so workers exit once it drains
        let (job_tx, job_rx) = mpsc::channel(windows.len());
        for window in windows {
            // Capacity equals the job count, so this never waits
            if job_tx.send(window).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let jobs = Arc::new(Mutex::new(job_rx));

        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<Outcome>();
        let mut pool = JoinSet::new();
        for _ in 0..self.workers {
            let jobs = jobs.clone();
            let outcomes = outcome_tx.clone();
            let source = self.source.clone();
            let repo = repo.clone();
            let filters = filters.clone();
            pool.spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(window) = next else { break };

                    let result = source.fetch(&repo, &window, &filters).await;
                    let failed = result.is_err();
                    if outcomes.send((window, result)).is_err() || failed {
                        // A failed worker stops taking jobs; its peers keep going
                        break;
                    }
                }
            });
        }
        drop(outcome_tx);

        let mut all_prs = Vec::new();
        let mut first_error: Option<FetchError> = None;

        // Closes once every worker has exited
        while let Some((window, result)) = outcome_rx.recv().await {
            match result {
                Ok(prs) => {
                    self.observer.window_fetched(&window, prs.len());
                    all_prs.extend(prs);
                }
                Err(e) => {
                    log::warn!("Fetch failed for {}: {}", window, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                first_error.get_or_insert(FetchError::Worker(e.to_string()));
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        self.observer.fetch_finished(all_prs.len());
        Ok(all_prs)
    }

    async fn fetch_single(
        &self,
        repo: &RepoId,
        window: TimeWindow,
        filters: &FetchFilters,
    ) -> Result<Vec<PullRequest>, FetchError> {
        self.observer.fetch_started(1, 1);
        let prs = self.source.fetch(repo, &window, filters).await?;
        self.observer.window_fetched(&window, prs.len());
        self.observer.fetch_finished(prs.len());
        Ok(prs)
    }
}
