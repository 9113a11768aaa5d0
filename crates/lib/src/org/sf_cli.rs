//! Transport over the Salesforce CLI (`sf`).
//!
//! Each request runs one `sf` command with `--json`. Deploy requests stage
//! `package.xml` (and `destructiveChanges.xml` when needed) in a temporary
//! directory and run from the project root so the CLI resolves source files
//! from the manifest. Manifest retrieval pulls the requested types into a
//! temporary directory and hashes them with the local inventory scanner, so
//! org hashes compare directly against local hashes.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::job::TestLevel;
use crate::metadata::{registry, scan_project};

use super::transport::{
  DeploySubmission, FailureKind, ManifestQuery, Operation, OrgRequest, OrgResponse, OrgTransport,
  QuickDeploySubmission, StatusQuery, TransportError,
};

const DEFAULT_PROGRAM: &str = "sf";

/// Error names (or message fragments) that indicate a retryable network problem.
const TRANSIENT_MARKERS: &[&str] = &[
  "ECONNRESET",
  "ECONNREFUSED",
  "ETIMEDOUT",
  "ENOTFOUND",
  "EAI_AGAIN",
  "EPIPE",
  "socket hang up",
  "ServerUnavailable",
  "Service Unavailable",
  "UNABLE_TO_LOCK_ROW",
  "REQUEST_LIMIT_EXCEEDED",
];

/// Error names (or message fragments) that indicate missing or expired authorization.
const AUTH_MARKERS: &[&str] = &[
  "NoAuthInfo",
  "NoOrgFound",
  "NamedOrgNotFound",
  "NoDefaultEnvError",
  "AuthInfo",
  "RefreshTokenAuthError",
  "INVALID_SESSION_ID",
  "InvalidSessionId",
  "expired access/refresh token",
];

#[derive(Debug, Clone)]
pub struct SfCliTransport {
  program: String,
  /// Arguments placed before every subcommand, e.g. `["sf"]` for `npx sf`.
  base_args: Vec<String>,
}

impl Default for SfCliTransport {
  fn default() -> Self {
    Self::new()
  }
}

impl SfCliTransport {
  pub fn new() -> Self {
    Self::with_program(DEFAULT_PROGRAM)
  }

  /// Use a different executable, e.g. an absolute path to `sf`.
  pub fn with_program(program: impl Into<String>) -> Self {
    Self::with_command(program, Vec::new())
  }

  /// Run `program base_args... <subcommand>` for every request.
  pub fn with_command(program: impl Into<String>, base_args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      base_args,
    }
  }

  async fn run(&self, args: &[String], cwd: Option<&Path>) -> Result<(i32, Value), TransportError> {
    let mut command = Command::new(&self.program);
    command
      .args(&self.base_args)
      .args(args)
      .arg("--json")
      .env("SF_DISABLE_COLORS", "true")
      .kill_on_drop(true);
    if let Some(dir) = cwd {
      command.current_dir(dir);
    }

    debug!(program = %self.program, args = ?args, "running sf");

    let output = command.output().await.map_err(|source| TransportError::Spawn {
      program: self.program.clone(),
      source,
    })?;

    let exit_status = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.stderr.is_empty() {
      debug!(stderr = %String::from_utf8_lossy(&output.stderr), "sf stderr");
    }

    let json = serde_json::from_str(stdout.trim()).map_err(|e| TransportError::Output {
      program: self.program.clone(),
      message: format!("exit status {}: {}", exit_status, e),
    })?;
    Ok((exit_status, json))
  }

  async fn retrieve_manifest(&self, request: &OrgRequest) -> Result<OrgResponse, TransportError> {
    let query: ManifestQuery = request.decode()?;
    let types: Vec<String> = if query.types.is_empty() {
      registry::known_types().into_iter().map(String::from).collect()
    } else {
      query.types
    };

    let staging = TempDir::new().map_err(TransportError::Stage)?;
    let output_dir = staging.path().join("retrieved");
    let args = retrieve_args(&request.org_alias, &types, &output_dir);

    let (exit_status, json) = self.run(&args, Some(staging.path())).await?;
    let response = into_response(exit_status, json, false);
    if response.output.is_err() {
      return Ok(response);
    }

    if !output_dir.exists() {
      return Ok(OrgResponse::ok(json!({ "components": [] })));
    }

    let inventory = scan_project(&output_dir).map_err(|e| TransportError::Output {
      program: self.program.clone(),
      message: format!("retrieved metadata could not be read: {}", e),
    })?;
    let components: Vec<Value> = inventory
      .snapshot
      .components
      .values()
      .map(|c| {
        json!({
          "type": c.type_name,
          "fullName": c.api_name,
          "contentHash": c.content_hash.0,
          "lastModified": c.last_modified,
        })
      })
      .collect();

    info!(org = %request.org_alias, components = components.len(), "retrieved org manifest");
    Ok(OrgResponse::ok(json!({ "components": components })))
  }

  async fn submit_deploy(&self, request: &OrgRequest, check_only: bool) -> Result<OrgResponse, TransportError> {
    let submission: DeploySubmission = request.decode()?;
    let package = &submission.package;

    let staging = TempDir::new().map_err(TransportError::Stage)?;
    let manifest = staging.path().join("package.xml");
    tokio::fs::write(&manifest, package.package_xml(&submission.api_version))
      .await
      .map_err(TransportError::Stage)?;

    let destructive = match package.destructive_changes_xml(&submission.api_version) {
      Some(xml) => {
        let path = staging.path().join("destructiveChanges.xml");
        tokio::fs::write(&path, xml).await.map_err(TransportError::Stage)?;
        Some(path)
      }
      None => None,
    };

    let verb = if check_only { "validate" } else { "start" };
    let args = deploy_args(
      verb,
      request.org_alias.as_str(),
      &manifest,
      destructive.as_deref(),
      submission.test_level,
      &submission.api_version,
    );

    info!(org = %request.org_alias, verb, components = package.len(), "submitting deploy");
    let (exit_status, json) = self.run(&args, Some(&package.root)).await?;
    Ok(into_response(exit_status, json, false))
  }

  async fn quick_deploy(&self, request: &OrgRequest) -> Result<OrgResponse, TransportError> {
    let submission: QuickDeploySubmission = request.decode()?;
    let args = strings(&[
      "project",
      "deploy",
      "quick",
      "--job-id",
      submission.validated_job_id.as_str(),
      "--target-org",
      request.org_alias.as_str(),
      "--async",
    ]);
    let (exit_status, json) = self.run(&args, None).await?;
    Ok(into_response(exit_status, json, false))
  }

  async fn deploy_status(&self, request: &OrgRequest) -> Result<OrgResponse, TransportError> {
    let query: StatusQuery = request.decode()?;
    let args = strings(&[
      "project",
      "deploy",
      "report",
      "--job-id",
      query.job_id.as_str(),
      "--target-org",
      request.org_alias.as_str(),
    ]);
    let (exit_status, json) = self.run(&args, None).await?;
    // A failed deploy still reports its result with a non-zero exit status.
    Ok(into_response(exit_status, json, true))
  }
}

#[async_trait]
impl OrgTransport for SfCliTransport {
  async fn call(&self, request: OrgRequest) -> Result<OrgResponse, TransportError> {
    match request.operation {
      Operation::RetrieveManifest => self.retrieve_manifest(&request).await,
      Operation::CheckDeploy => self.submit_deploy(&request, true).await,
      Operation::Deploy => self.submit_deploy(&request, false).await,
      Operation::QuickDeploy => self.quick_deploy(&request).await,
      Operation::DeployStatus => self.deploy_status(&request).await,
    }
  }
}

fn strings(args: &[&str]) -> Vec<String> {
  args.iter().map(|a| a.to_string()).collect()
}

fn retrieve_args(alias: &str, types: &[String], output_dir: &Path) -> Vec<String> {
  let mut args = strings(&["project", "retrieve", "start", "--target-org", alias]);
  for type_name in types {
    args.push("--metadata".to_string());
    args.push(type_name.clone());
  }
  args.push("--output-dir".to_string());
  args.push(output_dir.display().to_string());
  args
}

fn deploy_args(
  verb: &str,
  alias: &str,
  manifest: &Path,
  destructive: Option<&Path>,
  test_level: TestLevel,
  api_version: &str,
) -> Vec<String> {
  let mut args = strings(&["project", "deploy", verb, "--target-org", alias, "--async"]);
  args.push("--manifest".to_string());
  args.push(manifest.display().to_string());
  if let Some(path) = destructive {
    args.push("--post-destructive-changes".to_string());
    args.push(path.display().to_string());
  }
  if let Some(level) = test_level.as_cli_arg() {
    args.push("--test-level".to_string());
    args.push(level.to_string());
  }
  args.push("--api-version".to_string());
  args.push(api_version.to_string());
  args
}

/// Convert `sf --json` output into a response.
///
/// Success output is `{"status": 0, "result": …}`; failures carry `name`
/// and `message` at the top level.
fn into_response(exit_status: i32, json: Value, accept_failed_result: bool) -> OrgResponse {
  let status_ok = json.get("status").and_then(Value::as_i64) == Some(0);
  let result = json.get("result").filter(|r| !r.is_null());

  match result {
    Some(result) if status_ok || exit_status == 0 => {
      return OrgResponse {
        exit_status,
        output: Ok(result.clone()),
      };
    }
    Some(result) if accept_failed_result && result.get("status").is_some() => {
      return OrgResponse {
        exit_status,
        output: Ok(result.clone()),
      };
    }
    _ => {}
  }

  let name = json.get("name").and_then(Value::as_str).unwrap_or("UnknownError");
  let message = json
    .get("message")
    .and_then(Value::as_str)
    .unwrap_or("sf command failed without a message");
  OrgResponse {
    exit_status: if exit_status == 0 { 1 } else { exit_status },
    output: Err(super::transport::ErrorDetail::new(
      classify_failure(name, message),
      name,
      message,
    )),
  }
}

/// Classify an `sf` error by name and message.
pub fn classify_failure(name: &str, message: &str) -> FailureKind {
  let matches = |markers: &[&str]| markers.iter().any(|m| name.contains(m) || message.contains(m));
  if matches(AUTH_MARKERS) {
    FailureKind::Auth
  } else if matches(TRANSIENT_MARKERS) {
    FailureKind::Transient
  } else {
    FailureKind::Rejected
  }
}
