//! Real deploys, guarded by a matching validation.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::metadata::InventoryError;
use crate::org::{DeploySubmission, Operation, OrgTransport, QuickDeploySubmission};
use crate::package::DeployPackage;
use crate::util::hash::ContentHash;

use super::poll::{PollEnd, poll_job, submit};
use super::types::{JobError, JobKind, JobOptions, JobResult, JobStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
  /// Deploy the validated job id instead of resubmitting the package.
  pub quick_deploy: bool,
  pub job: JobOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
  Succeeded,
  SucceededWithWarnings,
  Failed,
  TimedOut,
  Aborted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
  pub outcome: DeployOutcome,
  pub job: JobResult,
  pub quick: bool,
  #[serde(with = "crate::util::serde_duration")]
  pub elapsed: Duration,
}

impl DeployReport {
  pub fn succeeded(&self) -> bool {
    matches!(
      self.outcome,
      DeployOutcome::Succeeded | DeployOutcome::SucceededWithWarnings
    )
  }
}

#[derive(Debug, Error)]
pub enum DeployError {
  #[error("job {job_id} is not a passed validation (kind {kind:?}, status {status})")]
  ValidationNotPassed {
    job_id: String,
    kind: JobKind,
    status: JobStatus,
  },

  #[error(
    "package changed since validation {job_id}: validated {}, current {}",
    .validated.short(),
    .current.short()
  )]
  StaleValidation {
    validated: ContentHash,
    current: ContentHash,
    job_id: String,
  },

  #[error("validation {job_id} ran against org '{validated_org}', not '{target_org}'")]
  OrgMismatch {
    job_id: String,
    validated_org: String,
    target_org: String,
  },

  #[error("failed to re-read package payload: {0}")]
  Payload(#[from] InventoryError),

  #[error(transparent)]
  Job(#[from] JobError),
}

/// Check that `validation` authorizes deploying `package` to `org`.
pub fn check_validation(org: &str, package: &DeployPackage, validation: &JobResult) -> Result<(), DeployError> {
  if validation.kind != JobKind::Validation || !validation.status.is_success() {
    return Err(DeployError::ValidationNotPassed {
      job_id: validation.job_id.clone(),
      kind: validation.kind,
      status: validation.status,
    });
  }
  if validation.package_hash != package.content_hash {
    return Err(DeployError::StaleValidation {
      validated: validation.package_hash.clone(),
      current: package.content_hash.clone(),
      job_id: validation.job_id.clone(),
    });
  }
  if validation.org_alias != org {
    return Err(DeployError::OrgMismatch {
      job_id: validation.job_id.clone(),
      validated_org: validation.org_alias.clone(),
      target_org: org.to_string(),
    });
  }
  Ok(())
}

/// Check that the files a full deploy would send are the ones validated.
///
/// A full deploy resubmits the payload from disk, so edits made after
/// validation make the validation stale.
pub fn check_payload(package: &DeployPackage, validation: &JobResult) -> Result<(), DeployError> {
  let current = package.current_hash()?;
  if current != package.content_hash {
    warn!(
      job_id = %validation.job_id,
      validated = %package.content_hash.short(),
      current = %current.short(),
      "payload changed on disk since validation"
    );
    return Err(DeployError::StaleValidation {
      validated: package.content_hash.clone(),
      current,
      job_id: validation.job_id.clone(),
    });
  }
  Ok(())
}

/// Deploy a validated package and follow the job to completion.
///
/// The validation must have passed for this exact package content and org;
/// a full deploy also re-reads the payload to make sure it is unchanged.
/// A failed deploy is reported, never retried.
pub async fn deploy_package(
  transport: &dyn OrgTransport,
  org: &str,
  package: &DeployPackage,
  validation: &JobResult,
  options: &DeployOptions,
  cancel: &CancellationToken,
) -> Result<DeployReport, DeployError> {
  check_validation(org, package, validation)?;
  if !options.quick_deploy {
    check_payload(package, validation)?;
  }

  let job_id = if options.quick_deploy {
    let submission = QuickDeploySubmission {
      validated_job_id: validation.job_id.clone(),
    };
    submit(transport, org, Operation::QuickDeploy, &submission, cancel).await?
  } else {
    let submission = DeploySubmission {
      package: package.clone(),
      test_level: options.job.test_level,
      api_version: options.job.api_version.clone(),
    };
    submit(transport, org, Operation::Deploy, &submission, cancel).await?
  };

  let mut job = JobResult::submitted(job_id, JobKind::Deploy, org, package.content_hash.clone());
  job.status = JobStatus::InProgress;
  let (end, elapsed) = poll_job(transport, &mut job, &options.job.poll, cancel).await?;

  let outcome = match end {
    PollEnd::TimedOut => DeployOutcome::TimedOut,
    PollEnd::Aborted => DeployOutcome::Aborted,
    PollEnd::Finished => match job.status {
      JobStatus::Succeeded => DeployOutcome::Succeeded,
      JobStatus::SucceededWithWarnings => DeployOutcome::SucceededWithWarnings,
      _ => DeployOutcome::Failed,
    },
  };

  match outcome {
    DeployOutcome::Succeeded | DeployOutcome::SucceededWithWarnings => {
      info!(org = %org, job_id = %job.job_id, quick = options.quick_deploy, ?outcome, "deploy finished");
    }
    DeployOutcome::Failed => {
      error!(org = %org, job_id = %job.job_id, failures = job.failures().count(), "deploy failed");
    }
    DeployOutcome::TimedOut | DeployOutcome::Aborted => {
      warn!(org = %org, job_id = %job.job_id, ?outcome, "deploy inconclusive");
    }
  }

  Ok(DeployReport {
    outcome,
    job,
    quick: options.quick_deploy,
    elapsed,
  })
}
