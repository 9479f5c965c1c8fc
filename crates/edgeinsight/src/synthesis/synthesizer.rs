//! Bounded, self-correcting report synthesis.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::extract::parse_report;
use super::prompt::{
    build_correction_message, build_prompt_body, build_user_message, PromptBudget,
    SYSTEM_INSTRUCTION,
};
use super::report::Report;
use crate::fetch::FetchedFile;
use crate::model::{LanguageModel, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub budget: PromptBudget,
    /// Model calls allowed before falling back to the degraded report.
    pub max_attempts: u32,
    pub max_output_tokens: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            budget: PromptBudget::default(),
            max_attempts: 3,
            max_output_tokens: 2048,
        }
    }
}

/// Result of one synthesis run. Always carries a usable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisOutcome {
    pub report: Report,
    pub attempts: u32,
    pub degraded: bool,
}

pub struct ReportSynthesizer {
    model: Arc<dyn LanguageModel>,
    config: SynthesisConfig,
}

impl ReportSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, config: SynthesisConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Produces a report for the given files.
    ///
    /// Each unparsable answer is fed back to the model together with the
    /// parse error. Transport errors use up an attempt without adding to the
    /// conversation. Once the attempts run out the degraded report is
    /// returned.
    pub async fn synthesize(&self, repo_reference: &str, files: &[FetchedFile]) -> SynthesisOutcome {
        let body = build_prompt_body(files, &self.config.budget);
        let mut messages = vec![
            Message::system(SYSTEM_INSTRUCTION),
            Message::user(build_user_message(repo_reference, &body)),
        ];

        let max_attempts = self.config.max_attempts.max(1);
        let started = Instant::now();

        for attempt in 1..=max_attempts {
            let response = match self
                .model
                .invoke(&messages, self.config.max_output_tokens)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        model = self.model.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Model call failed"
                    );
                    continue;
                }
            };

            match parse_report(&response) {
                Ok(report) => {
                    info!(
                        model = self.model.name(),
                        attempt,
                        verdict = %report.verdict_score,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Report synthesized"
                    );
                    return SynthesisOutcome {
                        report,
                        attempts: attempt,
                        degraded: false,
                    };
                }
                Err(e) => {
                    warn!(
                        model = self.model.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Model response was not a valid report"
                    );
                    messages.push(Message::assistant(response.raw_text()));
                    messages.push(Message::user(build_correction_message(&e)));
                }
            }
        }

        warn!(
            model = self.model.name(),
            max_attempts, "Retry budget exhausted, using degraded report"
        );
        SynthesisOutcome {
            report: Report::degraded(),
            attempts: max_attempts,
            degraded: true,
        }
    }
}
