mod deploy;
mod diff;
mod inventory;
mod package;
mod snapshot;
mod validate;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use sfdelta_lib::config::{ReferenceSource, WorkflowConfig};
use sfdelta_lib::job::TestLevel;
use sfdelta_lib::org::{OrgTransport, SfCliTransport};
use sfdelta_lib::workflow::Workflow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::output::OutputFormat;

pub use deploy::cmd_deploy;
pub use diff::cmd_diff;
pub use inventory::cmd_inventory;
pub use package::cmd_package;
pub use snapshot::{SnapshotCommand, cmd_snapshot};
pub use validate::cmd_validate;

/// Overrides the `sf` command, e.g. `/opt/sf/bin/sf` or `npx sf`.
pub const SF_BIN_ENV: &str = "SFDELTA_SF_BIN";

/// Resolved settings shared by every subcommand.
pub struct Context {
  pub config: WorkflowConfig,
  pub output: OutputFormat,
}

impl Context {
  pub fn load(project: &Path, config_path: Option<&Path>, output: OutputFormat) -> Result<Self> {
    let root = dunce::canonicalize(project)
      .with_context(|| format!("Project directory not found: {}", project.display()))?;
    let config = match config_path {
      Some(path) => WorkflowConfig::load_from(path, &root),
      None => WorkflowConfig::load(&root),
    }
    .context("Failed to load config")?;
    debug!(root = %root.display(), reference = %config.reference_source, "loaded project");
    Ok(Self { config, output })
  }

  pub fn with_overrides(mut self, reference: Option<ReferenceSource>, test_level: Option<TestLevel>) -> Self {
    if let Some(reference) = reference {
      self.config.reference_source = reference;
    }
    if let Some(level) = test_level {
      self.config.test_level = level;
    }
    self
  }

  pub fn transport(&self) -> Arc<dyn OrgTransport> {
    let command = std::env::var(SF_BIN_ENV).unwrap_or_default();
    let mut words = command.split_whitespace();
    match words.next() {
      Some(program) => Arc::new(SfCliTransport::with_command(program, words.map(String::from).collect())),
      None => Arc::new(SfCliTransport::new()),
    }
  }

  pub fn workflow(&self) -> Result<Workflow> {
    Workflow::new(self.config.clone(), self.transport()).context("Invalid config")
  }
}

/// Run `f` on a fresh runtime; Ctrl-C cancels the token it receives.
pub fn block_on_cancellable<F, Fut, T>(f: F) -> Result<T>
where
  F: FnOnce(CancellationToken) -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupted, cancelling");
        trigger.cancel();
      }
    });
    f(cancel).await
  })
}
