//! Parsing of Metadata API deploy results.
//!
//! The result shape is the Metadata API `DeployResult`: a `status` string
//! plus `details.componentFailures` / `details.componentSuccesses`, each of
//! which may be a single object or an array, and optional Apex test
//! failures under `details.runTestResult.failures`.

use serde::Deserialize;
use serde_json::Value;

use crate::metadata::ComponentId;

use super::types::{ComponentOutcome, ComponentResult, JobStatus};

/// One observation of a remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
  pub status: JobStatus,
  pub components: Vec<ComponentResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployResult {
  status: String,
  #[serde(default)]
  details: Option<Details>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Details {
  #[serde(default)]
  component_failures: OneOrMany<ComponentMessage>,
  #[serde(default)]
  component_successes: OneOrMany<ComponentMessage>,
  #[serde(default)]
  run_test_result: Option<RunTestResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentMessage {
  #[serde(default)]
  component_type: String,
  #[serde(default)]
  full_name: String,
  #[serde(default)]
  problem: Option<String>,
  #[serde(default)]
  problem_type: Option<String>,
  #[serde(default)]
  line_number: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunTestResult {
  #[serde(default)]
  failures: OneOrMany<TestFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestFailure {
  name: String,
  #[serde(default)]
  method_name: Option<String>,
  #[serde(default)]
  message: Option<String>,
}

/// A field that is sometimes an object, sometimes an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
  One(T),
  Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
  fn default() -> Self {
    OneOrMany::Many(Vec::new())
  }
}

impl<T> OneOrMany<T> {
  fn into_vec(self) -> Vec<T> {
    match self {
      OneOrMany::One(item) => vec![item],
      OneOrMany::Many(items) => items,
    }
  }
}

fn map_status(raw: &str) -> Option<JobStatus> {
  let status = match raw {
    "Pending" | "Queued" => JobStatus::Queued,
    "InProgress" | "Canceling" => JobStatus::InProgress,
    "Succeeded" => JobStatus::Succeeded,
    "SucceededPartial" => JobStatus::SucceededWithWarnings,
    "Failed" => JobStatus::Failed,
    "Canceled" => JobStatus::Canceled,
    _ => return None,
  };
  Some(status)
}

/// Parse a deploy result into a status update.
pub fn parse_status(output: &Value) -> Result<StatusUpdate, String> {
  let result: DeployResult = serde_json::from_value(output.clone()).map_err(|e| e.to_string())?;
  let mut status = map_status(&result.status).ok_or_else(|| format!("unknown job status '{}'", result.status))?;

  let details = result.details.unwrap_or_default();
  let mut components = Vec::new();

  for failure in details.component_failures.into_vec() {
    let Some(identity) = identity_of(&failure) else {
      continue;
    };
    let is_warning = failure.problem_type.as_deref() == Some("Warning");
    let message = describe_problem(&failure);
    components.push(ComponentResult {
      identity,
      outcome: if is_warning {
        ComponentOutcome::Warning
      } else {
        ComponentOutcome::Failed
      },
      error_messages: message.into_iter().collect(),
    });
  }

  for success in details.component_successes.into_vec() {
    let Some(identity) = identity_of(&success) else {
      continue;
    };
    let warning = describe_problem(&success);
    components.push(ComponentResult {
      identity,
      outcome: if warning.is_some() {
        ComponentOutcome::Warning
      } else {
        ComponentOutcome::Succeeded
      },
      error_messages: warning.into_iter().collect(),
    });
  }

  if let Some(tests) = details.run_test_result {
    for failure in tests.failures.into_vec() {
      let method = failure.method_name.unwrap_or_default();
      let message = failure.message.unwrap_or_else(|| "test failed".to_string());
      components.push(ComponentResult {
        identity: ComponentId::new("ApexClass", failure.name),
        outcome: ComponentOutcome::Failed,
        error_messages: vec![if method.is_empty() {
          message
        } else {
          format!("{}: {}", method, message)
        }],
      });
    }
  }

  // A success status never outranks a component that failed.
  if status.is_success() && components.iter().any(|c| c.outcome == ComponentOutcome::Failed) {
    status = JobStatus::Failed;
  } else if status == JobStatus::Succeeded && components.iter().any(|c| c.outcome == ComponentOutcome::Warning) {
    status = JobStatus::SucceededWithWarnings;
  }

  components.sort_by(|a, b| a.identity.cmp(&b.identity));
  Ok(StatusUpdate { status, components })
}

fn identity_of(message: &ComponentMessage) -> Option<ComponentId> {
  // The manifest itself is reported as a nameless success.
  if message.component_type.is_empty() || message.full_name.is_empty() {
    return None;
  }
  Some(ComponentId::new(&message.component_type, &message.full_name))
}

fn describe_problem(message: &ComponentMessage) -> Option<String> {
  let problem = message.problem.as_deref().filter(|p| !p.is_empty())?;
  Some(match &message.line_number {
    Some(line) if !line.is_null() => format!("line {}: {}", line, problem),
    _ => problem.to_string(),
  })
}
