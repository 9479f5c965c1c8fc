//! Durable job orchestration: fetch, synthesize, persist.

pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod state;

pub use context::PipelineContext;
pub use error::{PipelineError, UNKNOWN_PIPELINE_ERROR};
pub use progress::StageWriter;
pub use runner::{Orchestrator, ANALYZE_STEP};
pub use state::PipelineState;
