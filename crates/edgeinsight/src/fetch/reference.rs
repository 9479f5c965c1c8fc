//! Repository reference parsing.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Repository reference is empty")]
    Empty,

    #[error("Not a GitHub repository URL: {0}")]
    NotGithub(String),

    #[error("Invalid owner or repository name in '{0}'")]
    InvalidName(String),
}

/// A validated `github.com/<owner>/<name>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoReference {
    owner: String,
    name: String,
}

fn github_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:[^@/]+@)?(?:www\.)?github\.com[/:]([^/]+)/([^/?#]+)")
            .expect("valid repository regex")
    })
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl RepoReference {
    /// Parses a GitHub URL. Userinfo (tokens) is discarded, as are trailing
    /// path segments such as `/tree/main` and a `.git` suffix.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let caps = github_pattern()
            .captures(trimmed)
            .ok_or_else(|| ReferenceError::NotGithub(trimmed.to_string()))?;

        let owner = caps[1].to_string();
        let name = caps[2].trim_end_matches(".git").to_string();

        if !valid_segment(&owner) || !valid_segment(&name) {
            return Err(ReferenceError::InvalidName(trimmed.to_string()));
        }

        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://github.com/{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_url() {
        let reference = RepoReference::parse("https://github.com/acme/widget").unwrap();
        assert_eq!(reference.owner(), "acme");
        assert_eq!(reference.name(), "widget");
        assert_eq!(reference.to_string(), "https://github.com/acme/widget");
    }

    #[test]
    fn test_parse_strips_git_suffix_and_subpaths() {
        let reference = RepoReference::parse("https://github.com/acme/widget.git").unwrap();
        assert_eq!(reference.name(), "widget");

        let reference = RepoReference::parse("https://github.com/acme/widget/tree/main/src").unwrap();
        assert_eq!(reference.name(), "widget");
    }

    #[test]
    fn test_parse_without_scheme_and_ssh_form() {
        assert!(RepoReference::parse("github.com/acme/widget").is_ok());
        let ssh = RepoReference::parse("git@github.com:acme/widget.git").unwrap();
        assert_eq!(ssh.owner(), "acme");
        assert_eq!(ssh.name(), "widget");
    }

    #[test]
    fn test_parse_discards_token() {
        let reference = RepoReference::parse("https://ghp_secret@github.com/acme/widget").unwrap();
        assert!(!reference.to_string().contains("ghp_secret"));
    }

    #[test]
    fn test_parse_rejects_other_hosts_and_garbage() {
        assert_eq!(RepoReference::parse("   "), Err(ReferenceError::Empty));
        assert!(matches!(
            RepoReference::parse("https://gitlab.com/acme/widget"),
            Err(ReferenceError::NotGithub(_))
        ));
        assert!(matches!(
            RepoReference::parse("https://github.com/acme"),
            Err(ReferenceError::NotGithub(_))
        ));
        assert!(matches!(
            RepoReference::parse("https://github.com/ac me/widget"),
            Err(ReferenceError::InvalidName(_))
        ));
    }
}
