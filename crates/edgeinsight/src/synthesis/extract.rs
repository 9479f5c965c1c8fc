//! JSON extraction and report normalisation.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::report::{normalize_verdict_score, Report, SecurityRisk, Severity, MAX_SECURITY_RISKS};
use crate::model::ModelResponse;

/// File name used when the model leaves it blank.
const UNKNOWN_FILE: &str = "unknown";

#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("response was empty")]
    EmptyResponse,

    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidSeverity(String),
}

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(alias = "verdictScore", alias = "verdict")]
    verdict_score: String,
    summary: String,
    #[serde(default, alias = "techStack")]
    tech_stack: TechStack,
    #[serde(
        default,
        alias = "nativePlatformFit",
        alias = "cloudflare_native",
        alias = "cloudflareNative"
    )]
    native_platform_fit: bool,
    #[serde(default, alias = "securityRisks")]
    security_risks: Vec<RawRisk>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TechStack {
    List(Vec<String>),
    Joined(String),
}

impl Default for TechStack {
    fn default() -> Self {
        TechStack::List(Vec::new())
    }
}

impl TechStack {
    fn into_items(self) -> Vec<String> {
        let items = match self {
            TechStack::List(items) => items,
            TechStack::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawRisk {
    severity: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default, alias = "lineNumber", alias = "line")]
    line_number: Option<LineNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LineNumber {
    Number(u64),
    Text(String),
}

impl LineNumber {
    fn value(&self) -> Option<u32> {
        let line: Option<u32> = match self {
            LineNumber::Number(n) => u32::try_from(*n).ok(),
            LineNumber::Text(text) => text.trim().parse().ok(),
        };
        line.filter(|n| *n > 0)
    }
}

/// Strips markdown fences and slices from the first `{` to the last `}`.
pub fn extract_json_payload(text: &str) -> Result<&str, ReportParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ReportParseError::EmptyResponse);
    }

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&unfenced[start..=end]),
        _ => Err(ReportParseError::NoJsonObject),
    }
}

/// Parses and normalises a model response into a [`Report`].
pub fn parse_report(response: &ModelResponse) -> Result<Report, ReportParseError> {
    let raw: RawReport = match response {
        ModelResponse::Structured(Value::String(text)) | ModelResponse::Text(text) => {
            serde_json::from_str(extract_json_payload(text)?)?
        }
        ModelResponse::Structured(value) => RawReport::deserialize(value)?,
    };
    normalize(raw)
}

fn normalize(raw: RawReport) -> Result<Report, ReportParseError> {
    let security_risks = raw
        .security_risks
        .into_iter()
        .take(MAX_SECURITY_RISKS)
        .map(normalize_risk)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Report {
        verdict_score: normalize_verdict_score(&raw.verdict_score),
        summary: raw.summary.trim().to_string(),
        tech_stack: raw.tech_stack.into_items(),
        native_platform_fit: raw.native_platform_fit,
        security_risks,
    })
}

fn normalize_risk(raw: RawRisk) -> Result<SecurityRisk, ReportParseError> {
    let severity: Severity = raw
        .severity
        .parse()
        .map_err(ReportParseError::InvalidSeverity)?;

    let file = raw
        .file
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| UNKNOWN_FILE.to_string());

    Ok(SecurityRisk {
        severity,
        file,
        description: raw.description.trim().to_string(),
        snippet: raw
            .snippet
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        line_number: raw.line_number.as_ref().and_then(LineNumber::value),
    })
}
