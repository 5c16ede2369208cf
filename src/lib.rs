//! Engineering-process metrics from a repository's pull-request history.
//!
//! Records flow through [`window`] planning, the concurrent [`fetch`]
//! orchestrator, [`normalize`] and finally [`stats`].

pub mod actions;
pub mod config;
pub mod credentials;
pub mod fetch;
pub mod github;
pub mod normalize;
pub mod output;
pub mod progress;
pub mod stats;
pub mod window;
