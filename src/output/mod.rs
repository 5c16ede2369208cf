pub mod formatter;

pub use formatter::{
    format_actions_report, format_duration, format_report_heading, format_stats_report, format_tsv,
    should_use_colors,
};

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::github::types::PullRequest;
use crate::stats::AggregateStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    /// Statistics and PRs as one JSON document
    Json,
    /// One PR per line, tab-separated
    Tsv,
}

/// JSON export: the statistics snapshot plus the records it was computed from
#[derive(Debug, Serialize)]
pub struct PrReport<'a> {
    pub repo: String,
    pub since: Option<chrono::NaiveDate>,
    pub until: Option<chrono::NaiveDate>,
    pub stats: &'a AggregateStats,
    pub pull_requests: &'a [PullRequest],
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize report")
}

/// Write `content` to `path`, replacing it atomically
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open output file at {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if !content.ends_with('\n') {
        file.write_all(b"\n")?;
    }

    file.commit()
        .with_context(|| format!("Failed to save {}", path.display()))?;

    Ok(())
}
