//! Builders for model answers and fetched files.

#![allow(dead_code)]

use serde_json::{json, Value};

use edgeinsight::fetch::FetchedFile;
use edgeinsight::model::{ModelError, ModelResponse};

pub const REPO: &str = "https://github.com/acme/widget";

/// Builder for a report payload as the model would return it.
pub struct ReportJsonBuilder {
    verdict: String,
    summary: String,
    tech_stack: Vec<String>,
    native: bool,
    risks: Vec<Value>,
}

impl ReportJsonBuilder {
    pub fn new() -> Self {
        Self {
            verdict: "B".to_string(),
            summary: "A tidy widget service.".to_string(),
            tech_stack: vec!["TypeScript".to_string(), "Hono".to_string()],
            native: true,
            risks: Vec::new(),
        }
    }

    pub fn verdict(mut self, verdict: &str) -> Self {
        self.verdict = verdict.to_string();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn risk(mut self, severity: &str, file: &str, description: &str) -> Self {
        self.risks.push(json!({
            "severity": severity,
            "file": file,
            "description": description,
        }));
        self
    }

    pub fn to_value(&self) -> Value {
        json!({
            "verdict_score": self.verdict,
            "summary": self.summary,
            "tech_stack": self.tech_stack,
            "native_platform_fit": self.native,
            "security_risks": self.risks,
        })
    }

    /// The payload as free text, the way chat models usually answer.
    pub fn as_text(&self) -> Result<ModelResponse, ModelError> {
        Ok(ModelResponse::Text(self.to_value().to_string()))
    }

    /// The payload wrapped in a markdown fence with some chatter around it.
    pub fn as_fenced_text(&self) -> Result<ModelResponse, ModelError> {
        Ok(ModelResponse::Text(format!(
            "Here is the audit:\n```json\n{}\n```",
            self.to_value()
        )))
    }

    pub fn as_structured(&self) -> Result<ModelResponse, ModelError> {
        Ok(ModelResponse::Structured(self.to_value()))
    }
}

impl Default for ReportJsonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn malformed(text: &str) -> Result<ModelResponse, ModelError> {
    Ok(ModelResponse::Text(text.to_string()))
}

pub fn file(path: &str, content: &str) -> FetchedFile {
    FetchedFile::new(path, content)
}

/// `count` files whose contents add up to exactly `total_chars`.
pub fn files_totalling(count: usize, total_chars: usize) -> Vec<FetchedFile> {
    let base = total_chars / count;
    let remainder = total_chars % count;
    (0..count)
        .map(|i| {
            let len = base + usize::from(i < remainder);
            file(&format!("src/file{}.ts", i), &"x".repeat(len))
        })
        .collect()
}
