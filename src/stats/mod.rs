pub mod central;
pub mod classify;
pub mod engine;
pub mod hotfix;

pub use central::{CountStat, DurationStat};
pub use classify::MergeType;
pub use engine::{calculate_stats, AggregateStats, ESTIMATED_COMMITS_PER_PR};
