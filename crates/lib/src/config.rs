//! Workflow configuration.
//!
//! Loaded from `sfdelta.toml` in the project root. Every field has a default,
//! so a project without the file works out of the box. The CLI applies its
//! flags on top of the loaded value.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{
  CONFIG_FILENAME, DEFAULT_API_VERSION, DEFAULT_FETCH_INITIAL_BACKOFF_MS, DEFAULT_FETCH_MAX_ATTEMPTS,
  DEFAULT_FETCH_MAX_BACKOFF_MS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
};
use crate::job::{JobOptions, PollConfig, TestLevel};
use crate::order::{DependencyTable, OrderError, default_chain, default_prerequisites};
use crate::org::RetryPolicy;
use crate::snapshot::SnapshotStore;

/// What the local project is diffed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSource {
  /// The snapshot recorded by the last successful deploy to the org.
  #[default]
  PreviousDeploy,
  /// The org's current metadata, fetched live.
  OrgCurrent,
}

impl fmt::Display for ReferenceSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReferenceSource::PreviousDeploy => f.write_str("previous-deploy"),
      ReferenceSource::OrgCurrent => f.write_str("org-current"),
    }
  }
}

impl FromStr for ReferenceSource {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "previous-deploy" => Ok(ReferenceSource::PreviousDeploy),
      "org-current" => Ok(ReferenceSource::OrgCurrent),
      other => Err(format!(
        "unknown reference source '{}': expected previous-deploy or org-current",
        other
      )),
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid config {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("invalid config: {0}")]
  Invalid(String),

  #[error(transparent)]
  Order(#[from] OrderError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
  /// Project directory; set by the loader, never read from the file.
  #[serde(skip)]
  pub project_root: PathBuf,
  pub reference_source: ReferenceSource,
  pub poll_interval_secs: u64,
  pub poll_timeout_secs: u64,
  /// Ordered type chain; each entry is a prerequisite of the next.
  pub dependency_order: Vec<String>,
  /// Extra edges: type to the types it needs.
  pub prerequisites: BTreeMap<String, Vec<String>>,
  pub fetch_max_attempts: u32,
  pub fetch_initial_backoff_ms: u64,
  pub fetch_max_backoff_ms: u64,
  pub test_level: TestLevel,
  pub api_version: String,
  /// Overrides the data-directory location of deployed snapshot history.
  pub snapshot_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    Self {
      project_root: PathBuf::from("."),
      reference_source: ReferenceSource::default(),
      poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
      poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
      dependency_order: default_chain(),
      prerequisites: default_prerequisites(),
      fetch_max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
      fetch_initial_backoff_ms: DEFAULT_FETCH_INITIAL_BACKOFF_MS,
      fetch_max_backoff_ms: DEFAULT_FETCH_MAX_BACKOFF_MS,
      test_level: TestLevel::default(),
      api_version: DEFAULT_API_VERSION.to_string(),
      snapshot_dir: None,
    }
  }
}

impl WorkflowConfig {
  /// Defaults for a project root.
  pub fn for_project(root: impl Into<PathBuf>) -> Self {
    Self {
      project_root: root.into(),
      ..Self::default()
    }
  }

  /// Load `sfdelta.toml` from the project root, or defaults if absent.
  pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
    let path = project_root.join(CONFIG_FILENAME);
    if !path.exists() {
      debug!(root = %project_root.display(), "no config file, using defaults");
      return Ok(Self::for_project(project_root));
    }
    Self::load_from(&path, project_root)
  }

  /// Load a specific config file for a project root.
  pub fn load_from(path: &Path, project_root: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config: WorkflowConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;
    config.project_root = project_root.to_path_buf();
    debug!(path = %path.display(), "loaded config");
    Ok(config)
  }

  /// Check value ranges and build the dependency table.
  ///
  /// Returns the validated table so callers build it exactly once.
  pub fn validate(&self) -> Result<DependencyTable, ConfigError> {
    if self.poll_interval_secs == 0 {
      return Err(ConfigError::Invalid("poll_interval_secs must be greater than 0".to_string()));
    }
    if self.poll_timeout_secs < self.poll_interval_secs {
      return Err(ConfigError::Invalid(format!(
        "poll_timeout_secs ({}) must be at least poll_interval_secs ({})",
        self.poll_timeout_secs, self.poll_interval_secs
      )));
    }
    if self.fetch_max_attempts == 0 {
      return Err(ConfigError::Invalid("fetch_max_attempts must be at least 1".to_string()));
    }
    if self.api_version.trim().is_empty() {
      return Err(ConfigError::Invalid("api_version must not be empty".to_string()));
    }
    Ok(DependencyTable::new(&self.dependency_order, &self.prerequisites)?)
  }

  pub fn poll_config(&self) -> PollConfig {
    PollConfig {
      interval: Duration::from_secs(self.poll_interval_secs),
      timeout: Duration::from_secs(self.poll_timeout_secs),
    }
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.fetch_max_attempts,
      initial_backoff: Duration::from_millis(self.fetch_initial_backoff_ms),
      max_backoff: Duration::from_millis(self.fetch_max_backoff_ms),
    }
  }

  pub fn job_options(&self) -> JobOptions {
    JobOptions {
      test_level: self.test_level,
      api_version: self.api_version.clone(),
      poll: self.poll_config(),
    }
  }

  /// Deployed-snapshot history for an org.
  pub fn snapshot_store(&self, org_alias: &str) -> SnapshotStore {
    match &self.snapshot_dir {
      Some(dir) => SnapshotStore::for_org(dir.clone(), org_alias),
      None => SnapshotStore::default_for_org(org_alias),
    }
  }
}
