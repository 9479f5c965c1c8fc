use std::path::Path;

use crate::config::schema::AuditConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/audit-config-v1.json");

const SUPPORTED_VERSION: &str = "1.0";

/// Upper bound on synthesis attempts accepted from configuration.
pub const MAX_CONFIGURED_ATTEMPTS: u32 = 10;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AuditConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<AuditConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: AuditConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks the schema cannot express.
pub fn validate_config(config: &AuditConfig) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.budget.global_chars == 0 || config.budget.per_file_chars == 0 {
        return Err(ConfigError::Validation {
            message: "Context budgets must be greater than zero".to_string(),
        });
    }

    if !(1..=MAX_CONFIGURED_ATTEMPTS).contains(&config.synthesis.max_attempts) {
        return Err(ConfigError::Validation {
            message: format!(
                "synthesis.maxAttempts must be between 1 and {}, got {}",
                MAX_CONFIGURED_ATTEMPTS, config.synthesis.max_attempts
            ),
        });
    }

    if config.fetch.concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "fetch.concurrency must be at least 1".to_string(),
        });
    }

    if config.fetch.max_files == 0 || config.fetch.max_file_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "fetch.maxFiles and fetch.maxFileBytes must be greater than zero".to_string(),
        });
    }

    for (field, url) in [
        ("fetch.apiBaseUrl", &config.fetch.api_base_url),
        ("fetch.rawBaseUrl", &config.fetch.raw_base_url),
        ("model.endpoint", &config.model.endpoint),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation {
                message: format!("{} must be an http(s) URL, got '{}'", field, url),
            });
        }
    }

    Ok(())
}
