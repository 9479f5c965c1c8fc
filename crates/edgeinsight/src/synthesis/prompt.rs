//! Prompt construction under a character budget.
//!
//! Everything here is a pure function of its inputs so equal inputs always
//! produce byte-identical prompts.

use crate::fetch::FetchedFile;

/// Character limits applied while assembling the prompt body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    /// Running total after which no further files are added.
    pub global_chars: usize,
    /// Longest content included for any one file.
    pub per_file_chars: usize,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            global_chars: 60_000,
            per_file_chars: 8_000,
        }
    }
}

const SECTION_SEPARATOR: &str = "\n\n";

pub const SYSTEM_INSTRUCTION: &str = r#"You are a senior software auditor. You review a code repository and judge its language, quality, security posture and whether it could run natively on an edge runtime (JavaScript/TypeScript, Rust or WebAssembly, or Python workers) rather than needing a legacy server stack.

Respond with a single JSON object and nothing else. No markdown fences, no commentary. The object must have exactly these fields:
{
  "verdict_score": "a letter grade: A, B, C, D, F (optionally with + or -) or S for exceptional",
  "summary": "two or three sentences describing the project and its quality",
  "tech_stack": ["language, framework or notable library", "..."],
  "native_platform_fit": true or false,
  "security_risks": [
    {
      "severity": "critical | high | medium | low",
      "file": "path of the affected file",
      "description": "what the risk is and why it matters",
      "snippet": "optional short excerpt of the offending code",
      "line_number": optional integer line number
    }
  ]
}
List exactly three security risks, most severe first. If you find fewer real risks, describe the weakest areas of the code instead."#;

/// Renders one file section, truncating content beyond `per_file_chars`.
fn render_section(file: &FetchedFile, per_file_chars: usize) -> String {
    let total_chars = file.content.chars().count();
    let content = if total_chars > per_file_chars {
        let kept: String = file.content.chars().take(per_file_chars).collect();
        format!(
            "{}\n... [truncated {} characters]",
            kept,
            total_chars - per_file_chars
        )
    } else {
        file.content.clone()
    };
    format!("File: {}\n```\n{}\n```", file.path, content)
}

/// Concatenates file sections in list order until the global budget is
/// exceeded, then notes how many files were left out.
pub fn build_prompt_body(files: &[FetchedFile], budget: &PromptBudget) -> String {
    let mut body = String::new();
    let mut total_chars = 0usize;
    let mut omitted = 0usize;

    for (index, file) in files.iter().enumerate() {
        if total_chars > budget.global_chars {
            omitted = files.len() - index;
            break;
        }
        if !body.is_empty() {
            body.push_str(SECTION_SEPARATOR);
            total_chars += SECTION_SEPARATOR.len();
        }
        let section = render_section(file, budget.per_file_chars);
        total_chars += section.chars().count();
        body.push_str(&section);
    }

    if omitted > 0 {
        body.push_str(SECTION_SEPARATOR);
        body.push_str(&format!(
            "[{} more files omitted: context budget reached]",
            omitted
        ));
    }

    body
}

pub fn build_user_message(repo_reference: &str, body: &str) -> String {
    format!(
        "Audit the repository {}.\n\nRepository contents:\n\n{}",
        repo_reference, body
    )
}

/// Follow-up sent after an unparsable response.
pub fn build_correction_message(error: &impl std::fmt::Display) -> String {
    format!(
        "Your previous response was invalid JSON. Error: {}. \
         Return only the corrected JSON object, with no markdown and no commentary.",
        error
    )
}
