//! Job types shared by validation and deploy.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_API_VERSION, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS};
use crate::metadata::ComponentId;
use crate::org::TransportError;
use crate::util::hash::ContentHash;

/// Apex test level requested for a deploy or validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestLevel {
  /// Let the org decide (tests run in production, not in sandboxes).
  #[default]
  Default,
  NoTestRun,
  RunLocalTests,
  RunAllTestsInOrg,
}

impl TestLevel {
  /// Value for `--test-level`, or `None` to omit the flag.
  pub fn as_cli_arg(self) -> Option<&'static str> {
    match self {
      TestLevel::Default => None,
      TestLevel::NoTestRun => Some("NoTestRun"),
      TestLevel::RunLocalTests => Some("RunLocalTests"),
      TestLevel::RunAllTestsInOrg => Some("RunAllTestsInOrg"),
    }
  }
}

impl FromStr for TestLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Default" | "default" => Ok(TestLevel::Default),
      "NoTestRun" => Ok(TestLevel::NoTestRun),
      "RunLocalTests" => Ok(TestLevel::RunLocalTests),
      "RunAllTestsInOrg" => Ok(TestLevel::RunAllTestsInOrg),
      other => Err(format!(
        "unknown test level '{}': expected Default, NoTestRun, RunLocalTests or RunAllTestsInOrg",
        other
      )),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
  Validation,
  Deploy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  Queued,
  InProgress,
  Succeeded,
  SucceededWithWarnings,
  Failed,
  Canceled,
}

impl JobStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      JobStatus::Succeeded | JobStatus::SucceededWithWarnings | JobStatus::Failed | JobStatus::Canceled
    )
  }

  pub fn is_success(self) -> bool {
    matches!(self, JobStatus::Succeeded | JobStatus::SucceededWithWarnings)
  }
}

impl fmt::Display for JobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      JobStatus::Queued => "queued",
      JobStatus::InProgress => "in progress",
      JobStatus::Succeeded => "succeeded",
      JobStatus::SucceededWithWarnings => "succeeded with warnings",
      JobStatus::Failed => "failed",
      JobStatus::Canceled => "canceled",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentOutcome {
  Succeeded,
  Warning,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResult {
  pub identity: ComponentId,
  pub outcome: ComponentOutcome,
  pub error_messages: Vec<String>,
}

/// A remote validation or deploy job.
///
/// Only the poll loop that owns the job updates it; once `status` is
/// terminal it no longer changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
  pub job_id: String,
  pub kind: JobKind,
  pub org_alias: String,
  /// Content hash of the package the job was submitted with.
  pub package_hash: ContentHash,
  pub status: JobStatus,
  pub component_results: Vec<ComponentResult>,
}

impl JobResult {
  pub fn submitted(job_id: String, kind: JobKind, org_alias: &str, package_hash: ContentHash) -> Self {
    Self {
      job_id,
      kind,
      org_alias: org_alias.to_string(),
      package_hash,
      status: JobStatus::Queued,
      component_results: Vec::new(),
    }
  }

  pub fn failures(&self) -> impl Iterator<Item = &ComponentResult> {
    self
      .component_results
      .iter()
      .filter(|r| r.outcome == ComponentOutcome::Failed)
  }

  pub fn warnings(&self) -> impl Iterator<Item = &ComponentResult> {
    self
      .component_results
      .iter()
      .filter(|r| r.outcome == ComponentOutcome::Warning)
  }
}

/// Polling cadence and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
  pub interval: Duration,
  pub timeout: Duration,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
      timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
    }
  }
}

/// Settings for submitting and following a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
  pub test_level: TestLevel,
  pub api_version: String,
  pub poll: PollConfig,
}

impl Default for JobOptions {
  fn default() -> Self {
    Self {
      test_level: TestLevel::default(),
      api_version: DEFAULT_API_VERSION.to_string(),
      poll: PollConfig::default(),
    }
  }
}

#[derive(Debug, Error)]
pub enum JobError {
  #[error("submission to org '{org}' rejected: {message}")]
  Submission { org: String, message: String },

  #[error("job {job_id} did not finish within {}s", .elapsed.as_secs())]
  Timeout { job_id: String, elapsed: Duration },

  #[error("polling job {job_id} failed: {message}")]
  Poll { job_id: String, message: String },

  #[error("validation {job_id} failed with {failures} component failure(s)")]
  ValidationFailed { job_id: String, failures: usize },

  #[error("job {} aborted", .job_id.as_deref().unwrap_or("<not submitted>"))]
  Aborted { job_id: Option<String> },

  #[error(transparent)]
  Transport(#[from] TransportError),
}
