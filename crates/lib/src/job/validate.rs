//! Check-only validation of a deploy package.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::org::{DeploySubmission, Operation, OrgTransport};
use crate::package::DeployPackage;

use super::poll::{PollEnd, poll_job, submit};
use super::types::{JobError, JobKind, JobOptions, JobResult, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
  Passed,
  PassedWithWarnings,
  Failed,
  /// Inconclusive: the job did not finish within the poll timeout.
  TimedOut,
  /// Local bookkeeping only; nothing was cancelled remotely.
  Aborted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
  pub outcome: ValidationOutcome,
  pub job: JobResult,
  #[serde(with = "crate::util::serde_duration")]
  pub elapsed: Duration,
}

impl ValidationReport {
  pub fn passed(&self) -> bool {
    matches!(
      self.outcome,
      ValidationOutcome::Passed | ValidationOutcome::PassedWithWarnings
    )
  }

  /// The passed job, or the error describing why it cannot be deployed.
  pub fn require_passed(self) -> Result<JobResult, JobError> {
    match self.outcome {
      ValidationOutcome::Passed | ValidationOutcome::PassedWithWarnings => Ok(self.job),
      ValidationOutcome::Failed => Err(JobError::ValidationFailed {
        failures: self.job.failures().count(),
        job_id: self.job.job_id,
      }),
      ValidationOutcome::TimedOut => Err(JobError::Timeout {
        job_id: self.job.job_id,
        elapsed: self.elapsed,
      }),
      ValidationOutcome::Aborted => Err(JobError::Aborted {
        job_id: Some(self.job.job_id),
      }),
    }
  }
}

/// Submit a check-only deploy of `package` to `org` and follow it.
///
/// Runs `Submitted → Polling → {Passed, PassedWithWarnings, Failed, TimedOut,
/// Aborted}`. A failed, timed-out or aborted validation is a report, not an
/// error; errors are reserved for submission and polling failures.
pub async fn validate_package(
  transport: &dyn OrgTransport,
  org: &str,
  package: &DeployPackage,
  options: &JobOptions,
  cancel: &CancellationToken,
) -> Result<ValidationReport, JobError> {
  if package.is_empty() {
    return Err(JobError::Submission {
      org: org.to_string(),
      message: "package is empty".to_string(),
    });
  }

  let submission = DeploySubmission {
    package: package.clone(),
    test_level: options.test_level,
    api_version: options.api_version.clone(),
  };
  let job_id = submit(transport, org, Operation::CheckDeploy, &submission, cancel).await?;

  let mut job = JobResult::submitted(job_id, JobKind::Validation, org, package.content_hash.clone());
  job.status = JobStatus::InProgress;
  let (end, elapsed) = poll_job(transport, &mut job, &options.poll, cancel).await?;

  let outcome = match end {
    PollEnd::TimedOut => ValidationOutcome::TimedOut,
    PollEnd::Aborted => ValidationOutcome::Aborted,
    PollEnd::Finished => match job.status {
      JobStatus::Succeeded => ValidationOutcome::Passed,
      JobStatus::SucceededWithWarnings => ValidationOutcome::PassedWithWarnings,
      _ => ValidationOutcome::Failed,
    },
  };

  match outcome {
    ValidationOutcome::Passed | ValidationOutcome::PassedWithWarnings => {
      info!(org = %org, job_id = %job.job_id, ?outcome, elapsed_ms = elapsed.as_millis() as u64, "validation passed");
    }
    ValidationOutcome::Failed => {
      error!(org = %org, job_id = %job.job_id, failures = job.failures().count(), "validation failed");
    }
    ValidationOutcome::TimedOut | ValidationOutcome::Aborted => {
      warn!(org = %org, job_id = %job.job_id, ?outcome, "validation inconclusive");
    }
  }

  Ok(ValidationReport { outcome, job, elapsed })
}
