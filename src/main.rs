use chrono::{Duration, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use pr_pulse::actions::{analyze_workflow_runs, attach_failure_jobs, ActionsSource, OctocrabActions};
use pr_pulse::config::{load_config, validate_config, Config};
use pr_pulse::credentials::CredentialError;
use pr_pulse::fetch::{FetchObserver, FetchOrchestrator, LogObserver};
use pr_pulse::github::{
    authenticated_client, detect_repo_from_git_remote, enrich_review_comments, FetchError,
    FetchFilters, OctocrabCommentSource, OctocrabSource, RepoId,
};
use pr_pulse::output::{self, OutputFormat, PrReport};
use pr_pulse::progress::SpinnerObserver;
use pr_pulse::window::{parse_flexible_date, TimeWindow};

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_RATE_LIMIT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Args, Debug, Default)]
struct RangeArgs {
    /// Repository as owner/name (defaults to config, then the origin remote)
    #[arg(short, long)]
    repo: Option<String>,

    /// Start date: YYYY-MM-DD, "30 days ago", "2024-01", "2024-Q1", "last monday"...
    #[arg(long)]
    since: Option<String>,

    /// End date, inclusive (same formats as --since)
    #[arg(long)]
    until: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct PrsArgs {
    #[command(flatten)]
    range: RangeArgs,

    /// Only PRs opened by this user
    #[arg(long)]
    author: Option<String>,

    /// Only PRs carrying this label
    #[arg(long)]
    label: Option<String>,

    /// Skip PRs that are still open
    #[arg(long)]
    exclude_open: bool,

    /// Skip the per-PR review comment lookups
    #[arg(long)]
    no_enrich: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull request statistics (default if no subcommand)
    Prs(PrsArgs),
    /// GitHub Actions workflow run statistics
    Actions(RangeArgs),
}

#[derive(Parser, Debug)]
#[command(name = "pr-pulse")]
#[command(about = "Engineering metrics from GitHub pull-request history", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/pr-pulse/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn fail(code: i32, message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn fetch_exit_code(e: &FetchError) -> i32 {
    match e {
        FetchError::Auth => EXIT_AUTH,
        FetchError::NotFound(_) => EXIT_CONFIG,
        FetchError::RateLimited => EXIT_RATE_LIMIT,
        _ => EXIT_NETWORK,
    }
}

/// `--repo`, then the config file, then the origin remote
async fn resolve_repo(flag: Option<&str>, config: &Config) -> RepoId {
    if let Some(repo) = flag.or(config.repo.as_deref()) {
        return repo.parse().unwrap_or_else(|e| fail(EXIT_CONFIG, e));
    }
    match detect_repo_from_git_remote().await {
        Ok(repo) => {
            log::info!("Using repository {} from git remote", repo);
            repo
        }
        Err(e) => fail(EXIT_CONFIG, format!("Could not determine repository: {:#}", e)),
    }
}

/// Resolve `--since`/`--until` into a half-open `[since, until)` date pair
fn resolve_dates(range: &RangeArgs) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let today = Local::now().date_naive();
    let parse = |value: Option<&str>| -> Option<NaiveDate> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        Some(parse_flexible_date(value, today).unwrap_or_else(|e| fail(EXIT_CONFIG, format!("Date error: {}", e))))
    };

    let since = parse(range.since.as_deref());
    // The command line treats --until as inclusive
    let until = parse(range.until.as_deref()).map(|d| d + Duration::days(1));

    if let (Some(since), Some(until)) = (since, until) {
        if since >= until {
            fail(EXIT_CONFIG, "--since must not be after --until");
        }
    }
    (since, until)
}

async fn client_or_exit() -> octocrab::Octocrab {
    match authenticated_client().await {
        Ok(client) => client,
        Err(e) if e.downcast_ref::<CredentialError>().is_some() => {
            fail(EXIT_AUTH, format!("Credential error: {}", e))
        }
        Err(e) => fail(EXIT_NETWORK, format!("{:#}", e)),
    }
}

fn emit(content: &str, destination: Option<&PathBuf>) {
    match destination {
        Some(path) => {
            if let Err(e) = output::write_output(path, content) {
                fail(EXIT_CONFIG, format!("{:#}", e));
            }
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{}", content),
    }
}

async fn run_prs(args: PrsArgs, config: &Config) {
    let start_time = Instant::now();
    let repo = resolve_repo(args.range.repo.as_deref(), config).await;
    let (since, until) = resolve_dates(&args.range);

    let planner = config
        .fetch
        .planner()
        .unwrap_or_else(|e| fail(EXIT_CONFIG, format!("Config error: {}", e)));
    let windows = planner.plan_dates(since, until);

    let filters = FetchFilters {
        author: args.author,
        label: args.label,
        include_open: config.fetch.include_open() && !args.exclude_open,
    };

    let client = client_or_exit().await;
    let source = Arc::new(OctocrabSource::new(client.clone(), config.fetch.page_limit()));

    let spinner = SpinnerObserver::new_if_tty("Fetching pull requests...").map(Arc::new);
    let observer: Arc<dyn FetchObserver> = match &spinner {
        Some(spinner) => spinner.clone() as Arc<dyn FetchObserver>,
        None => Arc::new(LogObserver),
    };

    let orchestrator = FetchOrchestrator::new(source)
        .with_workers(config.fetch.workers())
        .with_observer(observer);

    let prs = match orchestrator.fetch_all(&repo, windows, &filters).await {
        Ok(prs) => prs,
        Err(e) => {
            if let Some(spinner) = &spinner {
                spinner.finish("Fetch failed");
            }
            fail(fetch_exit_code(&e), e);
        }
    };

    let mut prs = pr_pulse::normalize::normalize(prs);

    if config.enrichment.enabled() && !args.no_enrich {
        let options = config
            .enrichment
            .options()
            .unwrap_or_else(|e| fail(EXIT_CONFIG, format!("Config error: {}", e)));
        let comments = Arc::new(OctocrabCommentSource::new(client));
        let found = enrich_review_comments(comments, &repo, &mut prs, &options).await;
        log::info!("Review comment counts found for {} PRs", found);
    }

    if let Some(spinner) = &spinner {
        spinner.clear();
    }

    let stats = pr_pulse::stats::calculate_stats(&prs);

    let content = match args.range.format {
        OutputFormat::Table => {
            let use_colors = args.range.output.is_none() && output::should_use_colors();
            format!(
                "{}\n{}",
                output::format_report_heading(&repo.to_string(), &TimeWindow::new(since, until), use_colors),
                output::format_stats_report(&stats, use_colors)
            )
        }
        OutputFormat::Json => {
            let report = PrReport {
                repo: repo.to_string(),
                since,
                until,
                stats: &stats,
                pull_requests: &prs,
            };
            output::to_json(&report).unwrap_or_else(|e| fail(EXIT_CONFIG, e))
        }
        OutputFormat::Tsv => output::format_tsv(&prs),
    };
    emit(&content, args.range.output.as_ref());

    log::info!("Analyzed {} PRs in {:?}", prs.len(), start_time.elapsed());
}

async fn run_actions(args: RangeArgs, config: &Config) {
    let repo = resolve_repo(args.repo.as_deref(), config).await;
    let (since, until) = resolve_dates(&args);
    let window = TimeWindow::new(since, until);

    let client = client_or_exit().await;
    let source = OctocrabActions::new(client);

    let spinner = SpinnerObserver::new_if_tty("Fetching workflow runs...");
    let runs = match source.list_runs(&repo, &window).await {
        Ok(runs) => runs,
        Err(e) => {
            if let Some(spinner) = &spinner {
                spinner.finish("Fetch failed");
            }
            fail(fetch_exit_code(&e), e);
        }
    };

    let mut analytics = analyze_workflow_runs(&runs);
    attach_failure_jobs(&source, &repo, &mut analytics.failures).await;
    if let Some(spinner) = &spinner {
        spinner.clear();
    }

    let content = match args.format {
        OutputFormat::Json => output::to_json(&analytics).unwrap_or_else(|e| fail(EXIT_CONFIG, e)),
        // Runs have no per-record TSV form; fall back to the table
        OutputFormat::Table | OutputFormat::Tsv => {
            let use_colors = args.output.is_none() && output::should_use_colors();
            format!(
                "Workflow runs for {}\nPeriod: {}\n{}",
                repo,
                window,
                output::format_actions_report(&analytics, use_colors)
            )
        }
    };
    emit(&content, args.output.as_ref());
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+); a second install is harmless
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    init_logging(cli.verbose);
    let command = cli.command.unwrap_or(Commands::Prs(PrsArgs::default()));

    let config_path = cli.config.map(PathBuf::from);
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => fail(EXIT_CONFIG, format!("Config error: {:#}", e)),
    };

    if let Err(errors) = validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    match command {
        Commands::Prs(args) => run_prs(args, &config).await,
        Commands::Actions(args) => run_actions(args, &config).await,
    }

    std::process::exit(EXIT_SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_exit_codes() {
        assert_eq!(fetch_exit_code(&FetchError::Auth), EXIT_AUTH);
        assert_eq!(fetch_exit_code(&FetchError::RateLimited), EXIT_RATE_LIMIT);
        assert_eq!(fetch_exit_code(&FetchError::NotFound("acme/widgets".parse().unwrap())), EXIT_CONFIG);
        assert_eq!(fetch_exit_code(&FetchError::Api("boom".to_string())), EXIT_NETWORK);
        assert_eq!(fetch_exit_code(&FetchError::Worker("panicked".to_string())), EXIT_NETWORK);
    }
}
