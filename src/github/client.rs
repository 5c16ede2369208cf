use anyhow::{Context, Result};
use octocrab::Octocrab;

use crate::credentials;

/// Build a GitHub client for the token found in the environment or the gh CLI.
///
/// A missing token surfaces as [`credentials::CredentialError`] inside the
/// returned error so callers can pick an exit code.
pub async fn authenticated_client() -> Result<Octocrab> {
    let token = credentials::resolve_token().await?;
    create_client(&token)
}

pub fn create_client(token: &str) -> Result<Octocrab> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .context("Failed to create GitHub client")
}
