//! The delta deploy pipeline.
//!
//! One workflow targets one org and runs strictly in sequence:
//! inventory and reference → diff → assemble → validate → deploy. After a
//! successful deploy the local snapshot becomes the org's new reference.
//! Workflows for different orgs can run concurrently; they share only the
//! read-only dependency table.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ConfigError, ReferenceSource, WorkflowConfig};
use crate::job::{
  DeployError, DeployOptions, DeployReport, JobError, JobResult, ValidationOutcome, ValidationReport, deploy_package,
  validate_package,
};
use crate::metadata::{Inventory, InventoryError, scan_project};
use crate::order::DependencyTable;
use crate::org::{FetchError, OrgTransport, fetch_org_snapshot};
use crate::package::{DeployPackage, PackageError, assemble};
use crate::snapshot::{ChangeSet, Snapshot, SnapshotError, SnapshotSource, diff};

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Inventory(#[from] InventoryError),

  #[error(transparent)]
  Snapshot(#[from] SnapshotError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error(transparent)]
  Job(#[from] JobError),

  #[error(transparent)]
  Deploy(#[from] DeployError),
}

/// Everything needed to validate and deploy one delta.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
  pub org: String,
  pub reference_source: ReferenceSource,
  /// Id of the reference snapshot the delta was computed against.
  pub reference_id: String,
  pub change_set: ChangeSet,
  pub package: DeployPackage,
  #[serde(skip)]
  pub local: Snapshot,
}

/// How a full run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
  /// Local project matches the reference; nothing was sent to the org.
  NothingToDeploy,
  Deployed,
  ValidationFailed,
  DeployFailed,
  /// A job did not finish within the poll timeout.
  TimedOut,
  Aborted,
}

impl RunOutcome {
  pub fn is_success(self) -> bool {
    matches!(self, RunOutcome::NothingToDeploy | RunOutcome::Deployed)
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
  pub outcome: RunOutcome,
  pub plan: Plan,
  pub validation: Option<ValidationReport>,
  pub deploy: Option<DeployReport>,
}

pub struct Workflow {
  config: WorkflowConfig,
  table: Arc<DependencyTable>,
  transport: Arc<dyn OrgTransport>,
}

impl Workflow {
  /// Validate the configuration and build the dependency table.
  pub fn new(config: WorkflowConfig, transport: Arc<dyn OrgTransport>) -> Result<Self, WorkflowError> {
    let table = Arc::new(config.validate()?);
    Ok(Self::with_table(config, table, transport))
  }

  /// Use an already validated table, shared with other workflows.
  pub fn with_table(config: WorkflowConfig, table: Arc<DependencyTable>, transport: Arc<dyn OrgTransport>) -> Self {
    Self {
      config,
      table,
      transport,
    }
  }

  pub fn config(&self) -> &WorkflowConfig {
    &self.config
  }

  pub fn table(&self) -> &Arc<DependencyTable> {
    &self.table
  }

  /// Scan the local project.
  pub fn inventory(&self) -> Result<Inventory, WorkflowError> {
    Ok(scan_project(&self.config.project_root)?)
  }

  /// Load the snapshot the local project is compared against.
  pub async fn reference(&self, org: &str, cancel: &CancellationToken) -> Result<Snapshot, WorkflowError> {
    match self.config.reference_source {
      ReferenceSource::PreviousDeploy => {
        let store = self.config.snapshot_store(org);
        match store.load_current()? {
          Some(snapshot) => Ok(snapshot),
          None => {
            info!(org = %org, "no previous deploy recorded, treating every component as new");
            Ok(Snapshot::empty(SnapshotSource::Org { alias: org.to_string() }))
          }
        }
      }
      ReferenceSource::OrgCurrent => {
        let snapshot = fetch_org_snapshot(
          self.transport.as_ref(),
          org,
          &[],
          &self.config.retry_policy(),
          cancel,
        )
        .await?;
        Ok(snapshot)
      }
    }
  }

  /// Compute the delta and assemble its package.
  pub async fn plan(&self, org: &str, cancel: &CancellationToken) -> Result<Plan, WorkflowError> {
    let inventory = self.inventory()?;
    let reference = self.reference(org, cancel).await?;

    let change_set = diff(&reference, &inventory.snapshot);
    info!(
      org = %org,
      reference = %reference.id,
      added = change_set.added.len(),
      modified = change_set.modified.len(),
      deleted = change_set.deleted.len(),
      "delta computed"
    );

    let package = assemble(&change_set, &inventory.files, &self.table)?;

    Ok(Plan {
      org: org.to_string(),
      reference_source: self.config.reference_source,
      reference_id: reference.id,
      change_set,
      package,
      local: inventory.snapshot,
    })
  }

  /// Check-only validation of a plan's package.
  pub async fn validate(
    &self,
    org: &str,
    plan: &Plan,
    cancel: &CancellationToken,
  ) -> Result<ValidationReport, WorkflowError> {
    let report = validate_package(
      self.transport.as_ref(),
      org,
      &plan.package,
      &self.config.job_options(),
      cancel,
    )
    .await?;
    Ok(report)
  }

  /// Deploy a validated plan; on success record the local snapshot for `org`.
  pub async fn deploy(
    &self,
    org: &str,
    plan: &Plan,
    validation: &JobResult,
    quick_deploy: bool,
    cancel: &CancellationToken,
  ) -> Result<DeployReport, WorkflowError> {
    let options = DeployOptions {
      quick_deploy,
      job: self.config.job_options(),
    };
    let report = deploy_package(self.transport.as_ref(), org, &plan.package, validation, &options, cancel).await?;

    if report.succeeded() {
      let store = self.config.snapshot_store(org);
      store.save_and_set_current(&plan.local)?;
      info!(org = %org, snapshot = %plan.local.id, "recorded deployed snapshot");
    }
    Ok(report)
  }

  /// Plan, validate and deploy in sequence.
  pub async fn run(&self, org: &str, quick_deploy: bool, cancel: &CancellationToken) -> Result<RunReport, WorkflowError> {
    let plan = self.plan(org, cancel).await?;

    if plan.package.is_empty() {
      info!(org = %org, "nothing to deploy");
      return Ok(RunReport {
        outcome: RunOutcome::NothingToDeploy,
        plan,
        validation: None,
        deploy: None,
      });
    }

    let validation = self.validate(org, &plan, cancel).await?;
    let blocked = match validation.outcome {
      ValidationOutcome::Passed | ValidationOutcome::PassedWithWarnings => None,
      ValidationOutcome::Failed => Some(RunOutcome::ValidationFailed),
      ValidationOutcome::TimedOut => Some(RunOutcome::TimedOut),
      ValidationOutcome::Aborted => Some(RunOutcome::Aborted),
    };
    if let Some(outcome) = blocked {
      warn!(org = %org, ?outcome, "stopping before deploy");
      return Ok(RunReport {
        outcome,
        plan,
        validation: Some(validation),
        deploy: None,
      });
    }

    let deploy = self.deploy(org, &plan, &validation.job, quick_deploy, cancel).await?;
    let outcome = match deploy.outcome {
      crate::job::DeployOutcome::Succeeded | crate::job::DeployOutcome::SucceededWithWarnings => RunOutcome::Deployed,
      crate::job::DeployOutcome::Failed => RunOutcome::DeployFailed,
      crate::job::DeployOutcome::TimedOut => RunOutcome::TimedOut,
      crate::job::DeployOutcome::Aborted => RunOutcome::Aborted,
    };

    Ok(RunReport {
      outcome,
      plan,
      validation: Some(validation),
      deploy: Some(deploy),
    })
  }
}
