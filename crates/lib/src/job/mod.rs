//! Remote jobs: check-only validation and real deploys.
//!
//! Both follow the same shape: submit once, then poll the job's status until
//! it is terminal, the poll timeout elapses, or the caller cancels.

mod deploy;
mod poll;
mod status;
mod types;
mod validate;

pub use deploy::{
  DeployError, DeployOptions, DeployOutcome, DeployReport, check_payload, check_validation, deploy_package,
};
pub use status::{StatusUpdate, parse_status};
pub use types::{
  ComponentOutcome, ComponentResult, JobError, JobKind, JobOptions, JobResult, JobStatus, PollConfig, TestLevel,
};
pub use validate::{ValidationOutcome, ValidationReport, validate_package};
