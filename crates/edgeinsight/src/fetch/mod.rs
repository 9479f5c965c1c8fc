//! Repository content fetching.
//!
//! Adapters return a bounded, filtered, ordered list of text files or a typed
//! error. The orchestrator never sees partial results.

pub mod github;
pub mod policy;
pub mod reference;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

pub use github::GithubFetcher;
pub use policy::{FetchPolicy, FileCandidate};
pub use reference::{ReferenceError, RepoReference};

/// One text file from the repository. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub content: String,
}

impl FetchedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Typed fetch failure. The display text is what a failed job reports.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid repository reference: {0}")]
    InvalidReference(#[from] ReferenceError),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Access to repository {reference} was denied (status {status})")]
    Unauthorized { reference: String, status: u16 },

    #[error("Repository host returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Repository request failed: {0}")]
    Transport(String),

    #[error("No files found in repository")]
    Empty,
}

impl FetchError {
    /// HTTP-style status describing the failure.
    pub fn status(&self) -> u16 {
        match self {
            FetchError::InvalidReference(_) => 400,
            FetchError::NotFound(_) => 404,
            FetchError::Unauthorized { status, .. } => *status,
            FetchError::Upstream { status, .. } => *status,
            FetchError::Transport(_) => 502,
            FetchError::Empty => 404,
        }
    }
}

/// Source of repository files.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(
        &self,
        reference: &RepoReference,
        credentials: Option<&SecretString>,
    ) -> Result<Vec<FetchedFile>, FetchError>;
}
