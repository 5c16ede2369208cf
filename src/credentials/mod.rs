use tokio::process::Command;

/// Environment variables checked for a GitHub token, in priority order
pub const TOKEN_ENV_VARS: [&str; 3] = ["PR_PULSE_GH_TOKEN", "GH_TOKEN", "GITHUB_TOKEN"];

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No GitHub token found. Set PR_PULSE_GH_TOKEN (or GH_TOKEN / GITHUB_TOKEN), or run `gh auth login`.")]
    TokenNotFound,
    #[error("gh CLI failed: {0}")]
    GhCli(String),
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First non-empty token among `vars`, read through `lookup`.
fn token_from_vars<F>(vars: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    vars.iter()
        .find_map(|var| lookup(*var).as_deref().and_then(non_empty))
}

/// Check the token environment variables.
/// Returns Some(token) for the first one set and non-empty, None otherwise.
pub fn get_token_from_env() -> Option<String> {
    token_from_vars(&TOKEN_ENV_VARS, |var| std::env::var(var).ok())
}

/// Ask an authenticated gh CLI for its token
async fn get_token_from_gh() -> Result<String, CredentialError> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await
        .map_err(|e| CredentialError::GhCli(e.to_string()))?;

    if !output.status.success() {
        log::debug!(
            "gh auth token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Err(CredentialError::TokenNotFound);
    }

    non_empty(&String::from_utf8_lossy(&output.stdout)).ok_or(CredentialError::TokenNotFound)
}

/// Resolve a token from the environment, falling back to `gh auth token`.
pub async fn resolve_token() -> Result<String, CredentialError> {
    if let Some(token) = get_token_from_env() {
        return Ok(token);
    }

    match get_token_from_gh().await {
        Ok(token) => {
            log::debug!("Using token from gh CLI");
            Ok(token)
        }
        Err(CredentialError::GhCli(e)) => {
            log::debug!("gh CLI unavailable: {}", e);
            Err(CredentialError::TokenNotFound)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(env: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |var| env.get(var).map(|v| v.to_string())
    }

    #[test]
    fn test_priority_order() {
        let env = HashMap::from([("GH_TOKEN", "from-gh"), ("GITHUB_TOKEN", "from-github")]);
        assert_eq!(token_from_vars(&TOKEN_ENV_VARS, lookup(&env)), Some("from-gh".to_string()));

        let env = HashMap::from([("PR_PULSE_GH_TOKEN", "mine"), ("GH_TOKEN", "from-gh")]);
        assert_eq!(token_from_vars(&TOKEN_ENV_VARS, lookup(&env)), Some("mine".to_string()));
    }

    #[test]
    fn test_blank_values_skipped() {
        let env = HashMap::from([("PR_PULSE_GH_TOKEN", "   "), ("GITHUB_TOKEN", " tok \n")]);
        assert_eq!(token_from_vars(&TOKEN_ENV_VARS, lookup(&env)), Some("tok".to_string()));
    }

    #[test]
    fn test_nothing_set() {
        let env = HashMap::new();
        assert_eq!(token_from_vars(&TOKEN_ENV_VARS, lookup(&env)), None);
    }
}
