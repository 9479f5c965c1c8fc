//! Orchestrator state machine.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Fetching,
    Synthesizing,
    PersistingSuccess,
    PersistingFailure { message: String },
    Done,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Start => "start",
            PipelineState::Fetching => "fetching",
            PipelineState::Synthesizing => "synthesizing",
            PipelineState::PersistingSuccess => "persisting_success",
            PipelineState::PersistingFailure { .. } => "persisting_failure",
            PipelineState::Done => "done",
        }
    }

    /// Whether `next` may follow this state. Every live state may fall into
    /// `PersistingFailure`; `Done` is final.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Done, _) => false,
            (PersistingFailure { .. }, Done) => true,
            (PersistingFailure { .. }, _) => false,
            (_, PersistingFailure { .. }) => true,
            (Start, Fetching) => true,
            (Fetching, Synthesizing) => true,
            (Synthesizing, PersistingSuccess) => true,
            (PersistingSuccess, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
