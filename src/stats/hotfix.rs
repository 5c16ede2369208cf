use chrono::{DateTime, Duration, Utc};

/// Result of pairing hotfix merges with the release each one followed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotfixMatches {
    /// Hotfix merge time minus the latest release merged strictly before it
    pub gaps: Vec<Duration>,
    /// Hotfixes with no earlier release
    pub without_release: usize,
}

/// Match every hotfix with the most recent release merged strictly before it.
pub fn match_hotfixes(mut releases: Vec<DateTime<Utc>>, hotfixes: &[DateTime<Utc>]) -> HotfixMatches {
    releases.sort();

    let mut matches = HotfixMatches::default();
    for &hotfix in hotfixes {
        // First release at or after the hotfix; the one before it is the match
        let idx = releases.partition_point(|release| *release < hotfix);
        match idx.checked_sub(1).map(|i| releases[i]) {
            Some(release) => matches.gaps.push(hotfix - release),
            None => matches.without_release += 1,
        }
    }
    matches
}
