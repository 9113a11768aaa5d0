//! Org transport abstraction.
//!
//! Every remote interaction goes through [`OrgTransport::call`]: one request
//! in, one structured response out. The transport owns authentication and
//! staging; callers only see JSON payloads and classified failures.

use std::fmt;
use std::io;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::job::TestLevel;
use crate::package::DeployPackage;

/// Remote operations the core issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  RetrieveManifest,
  CheckDeploy,
  Deploy,
  QuickDeploy,
  DeployStatus,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Operation::RetrieveManifest => "retrieve_manifest",
      Operation::CheckDeploy => "check_deploy",
      Operation::Deploy => "deploy",
      Operation::QuickDeploy => "quick_deploy",
      Operation::DeployStatus => "deploy_status",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrgRequest {
  pub org_alias: String,
  pub operation: Operation,
  pub payload: Value,
}

impl OrgRequest {
  pub fn new(org_alias: &str, operation: Operation, payload: &impl Serialize) -> Result<Self, TransportError> {
    let payload = serde_json::to_value(payload).map_err(|e| TransportError::InvalidRequest {
      operation,
      message: e.to_string(),
    })?;
    Ok(Self {
      org_alias: org_alias.to_string(),
      operation,
      payload,
    })
  }

  /// Decode the payload into a typed request.
  pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, TransportError> {
    serde_json::from_value(self.payload.clone()).map_err(|e| TransportError::InvalidRequest {
      operation: self.operation,
      message: e.to_string(),
    })
  }
}

/// How a remote failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// Network or service hiccup; safe to retry.
  Transient,
  /// Session expired or org not authorized; may recover after re-auth.
  Auth,
  /// The org refused the request; retrying will not help.
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{name}: {message}")]
pub struct ErrorDetail {
  pub kind: FailureKind,
  pub name: String,
  pub message: String,
}

impl ErrorDetail {
  pub fn new(kind: FailureKind, name: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind,
      name: name.into(),
      message: message.into(),
    }
  }

  pub fn is_retryable(&self) -> bool {
    matches!(self.kind, FailureKind::Transient | FailureKind::Auth)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrgResponse {
  pub exit_status: i32,
  pub output: Result<Value, ErrorDetail>,
}

impl OrgResponse {
  pub fn ok(output: Value) -> Self {
    Self {
      exit_status: 0,
      output: Ok(output),
    }
  }

  pub fn failure(kind: FailureKind, name: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      exit_status: 1,
      output: Err(ErrorDetail::new(kind, name, message)),
    }
  }
}

/// Local failures of the transport itself, as opposed to remote failures.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to stage package files: {0}")]
  Stage(#[source] io::Error),

  #[error("unreadable output from {program}: {message}")]
  Output { program: String, message: String },

  #[error("invalid {operation} request: {message}")]
  InvalidRequest { operation: Operation, message: String },
}

/// A channel to Salesforce orgs.
///
/// Implementations must be safe to share between concurrent workflows.
#[async_trait]
pub trait OrgTransport: Send + Sync {
  async fn call(&self, request: OrgRequest) -> Result<OrgResponse, TransportError>;
}

/// `RetrieveManifest` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestQuery {
  /// Types to list; empty means every type the transport knows.
  pub types: Vec<String>,
}

/// `CheckDeploy` and `Deploy` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySubmission {
  pub package: DeployPackage,
  pub test_level: TestLevel,
  pub api_version: String,
}

/// `QuickDeploy` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickDeploySubmission {
  pub validated_job_id: String,
}

/// `DeployStatus` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
  pub job_id: String,
}

/// Output of a submission: the remote job id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedJob {
  pub id: String,
}
