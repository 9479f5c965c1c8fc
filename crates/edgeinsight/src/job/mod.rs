pub mod record;

pub use record::{JobDescriptor, JobId, JobRecord, JobStage, JobStatus};
