//! Snapshot types.
//!
//! A snapshot is an immutable, ordered view of metadata components captured
//! from one source (the local project or an org) at one point in time.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::{ComponentId, MetadataComponent};
use crate::util::hash::{ContentHash, hash_entries};

/// Current version of the snapshot index format.
pub const SNAPSHOT_INDEX_VERSION: u32 = 1;

/// Where a snapshot was captured from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotSource {
  /// The local project source tree.
  Local,
  /// An org, identified by its CLI alias or username.
  Org { alias: String },
}

impl fmt::Display for SnapshotSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SnapshotSource::Local => write!(f, "local"),
      SnapshotSource::Org { alias } => write!(f, "org:{}", alias),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub id: String,
  pub source: SnapshotSource,
  /// Unix seconds.
  pub captured_at: u64,
  pub components: BTreeMap<ComponentId, MetadataComponent>,
}

impl Snapshot {
  /// Capture a snapshot now from a set of components.
  ///
  /// A later component with the same identity replaces an earlier one.
  pub fn new(source: SnapshotSource, components: impl IntoIterator<Item = MetadataComponent>) -> Self {
    Self::at(source, now_secs(), components)
  }

  /// Capture a snapshot with an explicit timestamp.
  pub fn at(source: SnapshotSource, captured_at: u64, components: impl IntoIterator<Item = MetadataComponent>) -> Self {
    let components: BTreeMap<ComponentId, MetadataComponent> = components.into_iter().map(|c| (c.id(), c)).collect();
    let id = generate_snapshot_id(captured_at, &content_hash_of(&components));
    Self {
      id,
      source,
      captured_at,
      components,
    }
  }

  /// A snapshot with no components, used when no reference exists yet.
  pub fn empty(source: SnapshotSource) -> Self {
    Self::new(source, std::iter::empty())
  }

  pub fn get(&self, id: &ComponentId) -> Option<&MetadataComponent> {
    self.components.get(id)
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }

  /// Hash over every component identity and content hash.
  pub fn content_hash(&self) -> ContentHash {
    content_hash_of(&self.components)
  }

  pub fn to_metadata(&self) -> SnapshotMetadata {
    SnapshotMetadata {
      id: self.id.clone(),
      captured_at: self.captured_at,
      component_count: self.components.len(),
      content_hash: self.content_hash(),
    }
  }
}

fn content_hash_of(components: &BTreeMap<ComponentId, MetadataComponent>) -> ContentHash {
  hash_entries(
    components
      .iter()
      .map(|(id, c)| (id.to_string(), c.content_hash.clone()))
      .collect(),
  )
}

/// Snapshot ids sort chronologically: `<unix secs>-<content hash prefix>`.
pub fn generate_snapshot_id(captured_at: u64, content_hash: &ContentHash) -> String {
  let prefix = &content_hash.0[..content_hash.0.len().min(8)];
  format!("{:010}-{}", captured_at, prefix)
}

pub(crate) fn now_secs() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}

/// Summary of a stored snapshot, kept in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
  pub id: String,
  pub captured_at: u64,
  pub component_count: usize,
  pub content_hash: ContentHash,
}

/// Index of stored snapshots for one org, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotIndex {
  pub version: u32,
  pub current: Option<String>,
  pub snapshots: Vec<SnapshotMetadata>,
}

impl Default for SnapshotIndex {
  fn default() -> Self {
    Self::new()
  }
}

impl SnapshotIndex {
  pub fn new() -> Self {
    Self {
      version: SNAPSHOT_INDEX_VERSION,
      current: None,
      snapshots: Vec::new(),
    }
  }

  /// Add or replace a snapshot entry.
  pub fn add(&mut self, metadata: SnapshotMetadata) {
    self.snapshots.retain(|s| s.id != metadata.id);
    self.snapshots.push(metadata);
  }

  /// Remove an entry; clears `current` if it pointed at it.
  pub fn remove(&mut self, id: &str) {
    self.snapshots.retain(|s| s.id != id);
    if self.current.as_deref() == Some(id) {
      self.current = None;
    }
  }

  pub fn set_current(&mut self, id: &str) -> Result<(), SnapshotError> {
    if !self.snapshots.iter().any(|s| s.id == id) {
      return Err(SnapshotError::NotFound(id.to_string()));
    }
    self.current = Some(id.to_string());
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.snapshots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.snapshots.is_empty()
  }
}

/// Errors from snapshot storage.
#[derive(Debug, Error)]
pub enum SnapshotError {
  #[error("failed to create snapshot directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read snapshot: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write snapshot: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse snapshot: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize snapshot: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("snapshot not found: {0}")]
  NotFound(String),

  #[error("unsupported snapshot index version: {0}")]
  UnsupportedVersion(u32),
}
