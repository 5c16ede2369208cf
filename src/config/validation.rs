use super::schema::Config;
use crate::github::types::RepoId;

fn check_duration(errors: &mut Vec<String>, field: &str, value: Option<&str>, min_secs: u64) {
    let Some(value) = value else { return };
    match humantime::parse_duration(value.trim()) {
        Ok(d) if d.as_secs() < min_secs => {
            errors.push(format!("{}: '{}' is too short (minimum {}s)", field, value, min_secs));
        }
        Ok(_) => {}
        Err(e) => errors.push(format!("{}: invalid duration '{}' - {}", field, value, e)),
    }
}

fn check_positive(errors: &mut Vec<String>, field: &str, value: Option<usize>) {
    if value == Some(0) {
        errors.push(format!("{}: must be at least 1", field));
    }
}

/// Validate configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref repo) = config.repo {
        if let Err(e) = repo.parse::<RepoId>() {
            errors.push(format!("repo: {}", e));
        }
    }

    check_positive(&mut errors, "fetch.workers", config.fetch.workers);
    check_positive(&mut errors, "fetch.page_limit", config.fetch.page_limit);
    check_duration(
        &mut errors,
        "fetch.chunk_threshold",
        config.fetch.chunk_threshold.as_deref(),
        24 * 60 * 60,
    );

    check_positive(&mut errors, "enrichment.workers", config.enrichment.workers);
    check_positive(&mut errors, "enrichment.sample_threshold", config.enrichment.sample_threshold);
    check_duration(&mut errors, "enrichment.timeout", config.enrichment.timeout.as_deref(), 1);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
