use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetch::FetchPolicy;
use crate::synthesis::{PromptBudget, SynthesisConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    pub version: String,
    /// SQLite file; defaults to `~/.edgeinsight/data/edgeinsight.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub synthesis: SynthesisSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub model: ModelSettings,
}

impl AuditConfig {
    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            budget: PromptBudget {
                global_chars: self.budget.global_chars,
                per_file_chars: self.budget.per_file_chars,
            },
            max_attempts: self.synthesis.max_attempts,
            max_output_tokens: self.synthesis.max_output_tokens,
        }
    }

    /// Configured database path, falling back to the per-user default.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        match &self.database_path {
            Some(path) => Some(PathBuf::from(crate::secrets::expand_home(
                &path.to_string_lossy(),
            ))),
            None => default_database_path(),
        }
    }
}

/// `~/.edgeinsight/data/edgeinsight.db`
fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".edgeinsight").join("data").join("edgeinsight.db"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetConfig {
    #[serde(default = "default_global_chars")]
    pub global_chars: usize,
    #[serde(default = "default_per_file_chars")]
    pub per_file_chars: usize,
}

fn default_global_chars() -> usize {
    60_000
}

fn default_per_file_chars() -> usize {
    8_000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            global_chars: default_global_chars(),
            per_file_chars: default_per_file_chars(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_output_tokens() -> u32 {
    2048
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSettings {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// File downloads in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    // Repository host token (optional; raises rate limits, reaches private repos)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env_var: Option<String>,
}

fn default_max_files() -> usize {
    40
}

fn default_max_file_bytes() -> u64 {
    100_000
}

fn default_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            api_base_url: default_api_base_url(),
            raw_base_url: default_raw_base_url(),
            token: None,
            token_file: None,
            token_env_var: None,
        }
    }
}

impl FetchSettings {
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            max_files: self.max_files,
            max_file_bytes: self.max_file_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    /// Chat-completions URL.
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model_name")]
    pub model: String,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env_var: Option<String>,
}

fn default_model_endpoint() -> String {
    "http://localhost:8080/v1/chat/completions".to_string()
}

fn default_model_name() -> String {
    "@cf/meta/llama-3.3-70b-instruct".to_string()
}

fn default_model_timeout_secs() -> u64 {
    120
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            model: default_model_name(),
            timeout_secs: default_model_timeout_secs(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: None,
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
