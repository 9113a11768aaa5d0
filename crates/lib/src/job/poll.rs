//! Job submission and the shared status poll loop.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::org::{FailureKind, Operation, OrgRequest, OrgTransport, StatusQuery, SubmittedJob};

use super::status::parse_status;
use super::types::{JobError, JobResult, PollConfig};

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEnd {
  /// The job reached a terminal status.
  Finished,
  /// The timeout elapsed first; the job may still be running remotely.
  TimedOut,
  /// The caller cancelled; the job is left as the org reports it.
  Aborted,
}

/// Submit a job and return its remote id.
///
/// Submissions are never retried: any remote failure is a `Submission` error.
pub(crate) async fn submit(
  transport: &dyn OrgTransport,
  org: &str,
  operation: Operation,
  payload: &impl Serialize,
  cancel: &CancellationToken,
) -> Result<String, JobError> {
  let request = OrgRequest::new(org, operation, payload)?;

  let response = tokio::select! {
    biased;
    _ = cancel.cancelled() => return Err(JobError::Aborted { job_id: None }),
    result = transport.call(request) => result?,
  };

  let output = response.output.map_err(|detail| JobError::Submission {
    org: org.to_string(),
    message: detail.to_string(),
  })?;

  let job: SubmittedJob = serde_json::from_value(output).map_err(|e| JobError::Submission {
    org: org.to_string(),
    message: format!("no job id in response: {}", e),
  })?;

  info!(org = %org, operation = %operation, job_id = %job.id, "job submitted");
  Ok(job.id)
}

/// Poll `job` until it is terminal, the timeout elapses, or `cancel` fires.
///
/// The clock starts when polling starts. A timeout is only reported once the
/// full timeout has elapsed, and polling always stops by then. Transient poll
/// failures are retried on the next tick without resetting the clock.
pub(crate) async fn poll_job(
  transport: &dyn OrgTransport,
  job: &mut JobResult,
  config: &PollConfig,
  cancel: &CancellationToken,
) -> Result<(PollEnd, Duration), JobError> {
  let start = Instant::now();
  let deadline = start + config.timeout;
  let request = OrgRequest::new(
    &job.org_alias,
    Operation::DeployStatus,
    &StatusQuery {
      job_id: job.job_id.clone(),
    },
  )?;

  loop {
    let response = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Ok((PollEnd::Aborted, start.elapsed())),
      result = transport.call(request.clone()) => result?,
    };

    match response.output {
      Ok(output) => {
        let update = parse_status(&output).map_err(|message| JobError::Poll {
          job_id: job.job_id.clone(),
          message,
        })?;
        job.status = update.status;
        job.component_results = update.components;
        debug!(job_id = %job.job_id, status = %job.status, "polled job");

        if job.status.is_terminal() {
          return Ok((PollEnd::Finished, start.elapsed()));
        }
      }
      Err(detail) if detail.kind == FailureKind::Transient => {
        warn!(job_id = %job.job_id, error = %detail, "status poll failed, will retry");
      }
      Err(detail) => {
        return Err(JobError::Poll {
          job_id: job.job_id.clone(),
          message: detail.to_string(),
        });
      }
    }

    let now = Instant::now();
    if now >= deadline {
      warn!(job_id = %job.job_id, timeout_secs = config.timeout.as_secs(), "job still running at timeout");
      return Ok((PollEnd::TimedOut, start.elapsed()));
    }

    let wait = config.interval.min(deadline - now);
    tokio::select! {
      biased;
      _ = cancel.cancelled() => return Ok((PollEnd::Aborted, start.elapsed())),
      _ = tokio::time::sleep(wait) => {}
    }
  }
}
