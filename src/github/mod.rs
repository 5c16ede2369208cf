pub mod client;
pub mod enrich;
pub mod remote;
pub mod search;
pub mod source;
pub mod types;

pub use client::{authenticated_client, create_client};
pub use enrich::{enrich_review_comments, EnrichOptions, OctocrabCommentSource, ReviewCommentSource};
pub use remote::detect_repo_from_git_remote;
pub use search::OctocrabSource;
pub use source::{FetchError, FetchFilters, RecordSource};
pub use types::{PrState, PullRequest, RepoId, Review};
