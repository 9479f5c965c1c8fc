use thiserror::Error;

use crate::fetch::FetchError;
use crate::store::StoreError;

/// Message recorded for any failure that is not a fetch error.
pub const UNKNOWN_PIPELINE_ERROR: &str = "Unknown pipeline error";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Store failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("Pipeline task panicked")]
    Panicked,
}

impl PipelineError {
    /// The text written to the failed job record. Only fetch errors are
    /// shown verbatim.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Fetch(e) => e.to_string(),
            _ => UNKNOWN_PIPELINE_ERROR.to_string(),
        }
    }
}
