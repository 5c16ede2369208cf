use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::github::enrich::EnrichOptions;
use crate::window::{TimeWindowPlanner, DEFAULT_CHUNK_THRESHOLD_DAYS};

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default repository as "owner/name"
    pub repo: Option<String>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct FetchConfig {
    pub workers: Option<usize>,
    pub chunk_threshold: Option<String>, // humantime, e.g. "30days"
    pub page_limit: Option<usize>,
    pub include_open: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    pub enabled: Option<bool>,
    pub workers: Option<usize>,
    pub timeout: Option<String>, // humantime, e.g. "10s"
    pub sample_threshold: Option<usize>,
}

fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| anyhow::anyhow!("{}: invalid duration '{}' - {}", field, value, e))
}

impl FetchConfig {
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(crate::fetch::DEFAULT_WORKERS)
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit.unwrap_or(crate::github::search::DEFAULT_PAGE_LIMIT)
    }

    pub fn include_open(&self) -> bool {
        self.include_open.unwrap_or(true)
    }

    pub fn planner(&self) -> anyhow::Result<TimeWindowPlanner> {
        let threshold = match self.chunk_threshold.as_deref() {
            Some(value) => chrono::Duration::from_std(parse_duration("fetch.chunk_threshold", value)?)?,
            None => chrono::Duration::days(DEFAULT_CHUNK_THRESHOLD_DAYS),
        };
        Ok(TimeWindowPlanner::new(threshold))
    }
}

impl EnrichmentConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn options(&self) -> anyhow::Result<EnrichOptions> {
        let defaults = EnrichOptions::default();
        Ok(EnrichOptions {
            workers: self.workers.unwrap_or(defaults.workers),
            timeout: match self.timeout.as_deref() {
                Some(value) => parse_duration("enrichment.timeout", value)?,
                None => defaults.timeout,
            },
            sample_threshold: self.sample_threshold.unwrap_or(defaults.sample_threshold),
        })
    }
}
