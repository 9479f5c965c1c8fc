use crate::job::{JobDescriptor, JobRecord, JobStage};

use super::error::PipelineError;
use super::state::PipelineState;

/// Mutable state of one orchestrator run.
pub struct PipelineContext {
    pub descriptor: JobDescriptor,

    /// Latest record handed to the stage writer.
    pub record: JobRecord,

    pub state: PipelineState,

    /// True when the analysis came from a checkpoint.
    pub replayed: bool,
}

impl PipelineContext {
    pub fn new(descriptor: JobDescriptor, record: JobRecord) -> Self {
        Self {
            descriptor,
            record,
            state: PipelineState::Start,
            replayed: false,
        }
    }

    /// Moves to `next`, rejecting transitions the state machine forbids.
    pub fn advance(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(&next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Updates the working record to a processing stage and returns it.
    pub fn set_stage(&mut self, stage: JobStage) -> &JobRecord {
        self.record = self.record.clone().with_stage(stage);
        &self.record
    }
}
