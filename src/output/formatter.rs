use chrono::Duration;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::actions::WorkflowAnalytics;
use crate::github::types::PullRequest;
use crate::stats::{AggregateStats, CountStat, DurationStat};
use crate::window::TimeWindow;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Format a duration for reports
/// "0s", "45.0s", "12m", "3h 20m"
pub fn format_duration(duration: Duration) -> String {
    if duration == Duration::zero() {
        return "0s".to_string();
    }

    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{:.1}s", duration.num_milliseconds() as f64 / 1000.0)
    }
}

fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate title to fit available width, accounting for Unicode
fn truncate_title(title: &str, max_width: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_width {
        title.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Left-aligned columns separated by two spaces, with an underlined header
fn render_table(headers: &[&str], rows: &[Vec<String>], use_colors: bool) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let pad = |cell: &str, width: usize| {
        let fill = width.saturating_sub(cell.chars().count());
        format!("{}{}", cell, " ".repeat(fill))
    };
    let join = |cells: Vec<String>| cells.join("  ").trim_end().to_string();

    let header = join(headers.iter().copied().zip(&widths).map(|(h, w)| pad(h, *w)).collect());
    let rule = join(widths.iter().map(|w| "-".repeat(*w)).collect());

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(if use_colors { header.bold().to_string() } else { header });
    lines.push(rule);
    for row in rows {
        lines.push(join(row.iter().zip(&widths).map(|(c, w)| pad(c.as_str(), *w)).collect()));
    }
    lines.join("\n")
}

fn section(title: &str, use_colors: bool) -> String {
    if use_colors {
        format!("\n{}", title.cyan().bold())
    } else {
        format!("\n{}", title)
    }
}

fn timing_row(label: &str, stat: &DurationStat) -> Vec<String> {
    vec![
        label.to_string(),
        format_duration(stat.average),
        format_duration(stat.median),
        stat.samples.to_string(),
    ]
}

fn count_row(label: &str, stat: &CountStat) -> Vec<String> {
    vec![
        label.to_string(),
        format!("{:.1}", stat.average),
        format!("{:.1}", stat.median),
        stat.max.to_string(),
    ]
}

/// Header line describing what was analyzed
pub fn format_report_heading(repo: &str, window: &TimeWindow, use_colors: bool) -> String {
    let title = format!("Pull request statistics for {}", repo);
    let title = if use_colors { title.bold().to_string() } else { title };
    format!("{}\nPeriod: {}", title, window)
}

/// Multi-section terminal report of aggregate PR statistics
pub fn format_stats_report(stats: &AggregateStats, use_colors: bool) -> String {
    if stats.total_prs == 0 {
        return "No pull requests found.".to_string();
    }

    let mut out = Vec::new();

    out.push(section("Basic metrics", use_colors));
    out.push(render_table(
        &["Metric", "Value"],
        &[
            vec!["Total PRs".to_string(), stats.total_prs.to_string()],
            vec!["Merged PRs".to_string(), stats.merged_prs.to_string()],
            vec!["Merge rate".to_string(), format_percent(stats.merge_rate)],
            vec!["Open drafts (WIP)".to_string(), stats.wip_prs.to_string()],
            vec!["Releases (main/master)".to_string(), stats.release_count.to_string()],
        ],
        use_colors,
    ));

    out.push(section("Timing", use_colors));
    out.push(render_table(
        &["Metric", "Average", "Median", "PRs"],
        &[
            timing_row("Lead time", &stats.lead_time),
            timing_row("Time to first review", &stats.review_time),
            timing_row("Merge wait (last review to merge)", &stats.merge_wait_time),
            timing_row("Approval to merge", &stats.approval_to_merge),
            timing_row("Reopen to merge", &stats.reopen_to_merge),
            timing_row("Review response", &stats.review_response_time),
        ],
        use_colors,
    ));

    out.push(section("Code changes", use_colors));
    out.push(render_table(
        &["Metric", "Average"],
        &[
            vec!["Files changed".to_string(), format!("{:.1}", stats.avg_files_changed)],
            vec!["Additions".to_string(), format!("{:.1}", stats.avg_additions)],
            vec!["Deletions".to_string(), format!("{:.1}", stats.avg_deletions)],
        ],
        use_colors,
    ));

    out.push(section("Collaboration", use_colors));
    out.push(render_table(
        &["Metric", "Value"],
        &[
            vec!["Reviewers per PR".to_string(), format!("{:.1}", stats.avg_reviewers_per_pr)],
            vec!["Self-merge rate".to_string(), format_percent(stats.self_merge_rate)],
            vec!["Reopened PRs".to_string(), stats.reopened_prs.to_string()],
            vec!["Reopen rate".to_string(), format_percent(stats.reopen_rate)],
            vec!["Revert-like merges".to_string(), stats.revert_like_merges.to_string()],
            vec![
                "Commits per week (estimated)".to_string(),
                format!("{:.1}", stats.estimated_commits_per_week),
            ],
        ],
        use_colors,
    ));

    out.push(section("Hotfixes", use_colors));
    out.push(render_table(
        &["Metric", "Value"],
        &[
            vec!["Hotfix merges".to_string(), stats.hotfix_merges.to_string()],
            vec![
                "Hotfix after release (avg)".to_string(),
                format_duration(stats.hotfix_after_release.average),
            ],
            vec![
                "Hotfix after release (median)".to_string(),
                format_duration(stats.hotfix_after_release.median),
            ],
            vec![
                "Hotfixes without prior release".to_string(),
                stats.hotfix_without_release.to_string(),
            ],
        ],
        use_colors,
    ));

    out.push(section("Comments", use_colors));
    out.push(render_table(
        &["Metric", "Average", "Median", "Max"],
        &[
            count_row("Comments per PR", &stats.comments),
            count_row("Review comments per PR", &stats.review_comments),
        ],
        use_colors,
    ));

    let total = stats.total_prs;
    let share = |n: usize| format_percent(n as f64 / total as f64 * 100.0);
    out.push(render_table(
        &["Coverage", "PRs", "Share"],
        &[
            vec!["With comments".to_string(), stats.prs_with_comments.to_string(), share(stats.prs_with_comments)],
            vec!["Without comments".to_string(), stats.prs_without_comments.to_string(), share(stats.prs_without_comments)],
            vec![
                "With review comments".to_string(),
                stats.prs_with_review_comments.to_string(),
                share(stats.prs_with_review_comments),
            ],
            vec![
                "Without review comments".to_string(),
                stats.prs_without_review_comments.to_string(),
                share(stats.prs_without_review_comments),
            ],
        ],
        use_colors,
    ));
    out.push(format!(
        "Comment density: {:.2} per 100 lines, review comment density: {:.2} per 100 lines",
        stats.comment_density, stats.review_comment_density
    ));

    if !stats.merge_type_trend.is_empty() {
        out.push(section("Merge types", use_colors));
        let rows: Vec<Vec<String>> = stats
            .merge_type_trend
            .iter()
            .map(|(kind, pct)| vec![kind.clone(), format_percent(*pct)])
            .collect();
        out.push(render_table(&["Merge type", "Share"], &rows, use_colors));
    }

    out.join("\n")
}

/// Format PRs as tab-separated values for piping, with a header row
pub fn format_tsv(prs: &[PullRequest]) -> String {
    let mut lines = vec![
        "number\ttitle\tauthor\tstate\tcreated_at\tmerged_at\tlead_time_hours\tadditions\tdeletions\tchanged_files\treviews\tcomments\treview_comments"
            .to_string(),
    ];

    lines.extend(prs.iter().map(|pr| {
        let lead_time = pr
            .lead_time
            .map(|d| format!("{:.2}", d.num_seconds() as f64 / 3600.0))
            .unwrap_or_default();
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            pr.number,
            pr.title.replace(['\t', '\n'], " "),
            pr.author.as_deref().unwrap_or("ghost"),
            pr.state.as_str(),
            pr.created_at.to_rfc3339(),
            pr.merged_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            lead_time,
            pr.additions,
            pr.deletions,
            pr.changed_files,
            pr.reviews.len(),
            pr.comment_count,
            pr.review_comment_count
        )
    }));

    lines.join("\n")
}

/// Terminal report for GitHub Actions workflow runs
pub fn format_actions_report(analytics: &WorkflowAnalytics, use_colors: bool) -> String {
    if analytics.totals.runs == 0 {
        return "No workflow runs found.".to_string();
    }

    let mut out = Vec::new();

    out.push(section("Workflow runs", use_colors));
    out.push(render_table(
        &["Metric", "Value"],
        &[
            vec!["Total runs".to_string(), analytics.totals.runs.to_string()],
            vec!["Successes".to_string(), analytics.totals.successes.to_string()],
            vec!["Failures".to_string(), analytics.totals.failures.to_string()],
            vec!["Success rate".to_string(), format_percent(analytics.totals.success_rate())],
            vec!["Average duration".to_string(), format_duration(analytics.average_duration)],
        ],
        use_colors,
    ));

    out.push(section("By workflow", use_colors));
    let rows: Vec<Vec<String>> = analytics
        .workflows
        .iter()
        .map(|(name, stats)| {
            vec![
                name.clone(),
                stats.counts.runs.to_string(),
                format_percent(stats.counts.success_rate()),
                stats.counts.failures.to_string(),
                format_duration(stats.average_duration),
            ]
        })
        .collect();
    out.push(render_table(
        &["Workflow", "Runs", "Success", "Failures", "Avg duration"],
        &rows,
        use_colors,
    ));

    out.push(section("By trigger", use_colors));
    let rows: Vec<Vec<String>> = analytics
        .events
        .iter()
        .map(|(event, counts)| {
            vec![
                event.clone(),
                counts.runs.to_string(),
                format_percent(counts.success_rate()),
                counts.failures.to_string(),
            ]
        })
        .collect();
    out.push(render_table(&["Event", "Runs", "Success", "Failures"], &rows, use_colors));

    if !analytics.failures.is_empty() {
        out.push(section("Recent failures", use_colors));
        let title_width = get_terminal_width().map_or(60, |w| w.saturating_sub(60).max(20));
        let rows: Vec<Vec<String>> = analytics
            .failures
            .iter()
            .map(|f| {
                let failed_at = match (&f.failed_job, &f.failed_step) {
                    (Some(job), Some(step)) => format!("{} / {}", job, step),
                    (Some(job), None) => job.clone(),
                    _ => "-".to_string(),
                };
                vec![
                    f.workflow_name.clone(),
                    truncate_title(&f.display_title, title_width),
                    f.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    f.duration.map(format_duration).unwrap_or_else(|| "-".to_string()),
                    failed_at,
                ]
            })
            .collect();
        out.push(render_table(
            &["Workflow", "Title", "Started", "Duration", "Failed at"],
            &rows,
            use_colors,
        ));
    }

    out.join("\n")
}
