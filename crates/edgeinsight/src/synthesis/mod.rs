//! Report synthesis: prompt budgeting, model invocation, JSON repair.

pub mod extract;
pub mod prompt;
pub mod report;
pub mod synthesizer;

pub use extract::{extract_json_payload, parse_report, ReportParseError};
pub use prompt::{build_prompt_body, PromptBudget};
pub use report::{Report, SecurityRisk, Severity};
pub use synthesizer::{ReportSynthesizer, SynthesisConfig, SynthesisOutcome};
