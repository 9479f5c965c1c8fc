//! The structured audit report attached to completed jobs.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upper bound on the number of security risks kept in a report.
pub const MAX_SECURITY_RISKS: usize = 3;

/// Verdict used when no grade could be determined.
pub const UNKNOWN_VERDICT: &str = "?";

/// Summary carried by the fallback report.
pub const DEGRADED_SUMMARY: &str =
    "Automated analysis could not produce a valid report for this repository. \
     The model response was malformed on every attempt.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" | "moderate" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!(
                "unknown severity '{}' (expected critical, high, medium or low)",
                other
            )),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRisk {
    pub severity: Severity,
    pub file: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

/// Audit report.
///
/// Values of this type are only produced by the synthesizer's normalisation
/// or by [`Report::degraded`], so a stored report is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub verdict_score: String,
    pub summary: String,
    pub tech_stack: Vec<String>,
    pub native_platform_fit: bool,
    pub security_risks: Vec<SecurityRisk>,
}

impl Report {
    /// The fallback report used once the retry budget is exhausted.
    pub fn degraded() -> Self {
        Self {
            verdict_score: UNKNOWN_VERDICT.to_string(),
            summary: DEGRADED_SUMMARY.to_string(),
            tech_stack: Vec::new(),
            native_platform_fit: false,
            security_risks: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        *self == Self::degraded()
    }

    /// Returns true if the verdict is a letter grade and the risk list is bounded.
    pub fn is_well_formed(&self) -> bool {
        is_letter_grade(&self.verdict_score) && self.security_risks.len() <= MAX_SECURITY_RISKS
    }
}

fn grade_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:[A-FS][+-]?|\?)$").expect("valid grade regex"))
}

fn leading_grade_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([A-FS][+-]?)(?:$|[^A-Za-z])").expect("valid grade regex"))
}

/// Letter grade `A`..`F` or `S`, optionally signed, or `?`.
pub fn is_letter_grade(score: &str) -> bool {
    grade_pattern().is_match(score)
}

/// Reduces a model-supplied verdict to its leading letter grade.
///
/// `"b+ (solid)"` becomes `"B+"`; anything without a leading grade becomes `"?"`.
pub fn normalize_verdict_score(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    leading_grade_pattern()
        .captures(&upper)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_VERDICT.to_string())
}
