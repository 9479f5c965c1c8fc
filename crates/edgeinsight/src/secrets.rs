//! Secret resolution for repository tokens and model API keys.
//!
//! Sources are tried in priority order:
//!
//! 1. **Direct value** in the config file (local testing)
//! 2. **File reference**, e.g. `tokenFile: /run/secrets/github_token`
//! 3. **Env var reference**, e.g. `apiKeyEnvVar: EDGEINSIGHT_MODEL_KEY`

use std::fs;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret file '{path}' is empty")]
    EmptyFile { path: String },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn from_file(path: &str) -> Result<SecretString> {
    let expanded = expand_home(path);
    let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
        path: expanded.clone(),
        source: e,
    })?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SecretError::EmptyFile { path: expanded });
    }
    Ok(SecretString::from(trimmed.to_string()))
}

fn from_env(name: &str) -> Result<SecretString> {
    match std::env::var(name) {
        // Env vars often carry a trailing newline.
        Ok(value) => Ok(SecretString::from(value.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
            name: name.to_string(),
        }),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

/// Resolves a secret from the first non-empty source. A configured source
/// that fails is an error; later sources are not tried.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = non_empty(direct) {
        return Ok(SecretString::from(value.to_string()));
    }
    if let Some(path) = non_empty(file_path) {
        return from_file(path);
    }
    if let Some(name) = non_empty(env_var) {
        return from_env(name);
    }
    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but no configured source means `None`.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Expands a leading `~` to the home directory. `~user/...` is not supported.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
