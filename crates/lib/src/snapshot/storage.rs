//! Snapshot storage.
//!
//! Keeps the history of snapshots that were successfully deployed to each
//! org. The current snapshot of an org is the "previous deploy" reference
//! the next delta is computed against.
//!
//! # Storage Layout
//!
//! ```text
//! {base}/
//! └── <org alias>/
//!     ├── index.json      # SnapshotIndex: list + current pointer
//!     └── <id>.json       # Individual Snapshot files
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::platform::paths::snapshots_dir;

use super::types::{SNAPSHOT_INDEX_VERSION, Snapshot, SnapshotError, SnapshotIndex, SnapshotMetadata};

/// Index file name.
const INDEX_FILENAME: &str = "index.json";

/// Manages deployed-snapshot history for one org.
///
/// Uses atomic write operations to prevent corruption.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  /// Directory for this org's snapshots.
  base_path: PathBuf,
}

impl SnapshotStore {
  /// Create a snapshot store at the given directory.
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  /// Snapshot store for an org under a root directory.
  ///
  /// The alias is sanitized so it is always a single path component.
  pub fn for_org(root: impl Into<PathBuf>, org_alias: &str) -> Self {
    Self::new(root.into().join(sanitize_alias(org_alias)))
  }

  /// Snapshot store for an org at the platform data directory.
  pub fn default_for_org(org_alias: &str) -> Self {
    Self::for_org(snapshots_dir(), org_alias)
  }

  pub fn base_path(&self) -> &PathBuf {
    &self.base_path
  }

  fn index_path(&self) -> PathBuf {
    self.base_path.join(INDEX_FILENAME)
  }

  fn snapshot_path(&self, id: &str) -> PathBuf {
    self.base_path.join(format!("{}.json", id))
  }

  fn ensure_dir(&self) -> Result<(), SnapshotError> {
    fs::create_dir_all(&self.base_path).map_err(SnapshotError::CreateDir)
  }

  /// Load the snapshot index.
  ///
  /// Returns an empty index if the file doesn't exist.
  pub fn load_index(&self) -> Result<SnapshotIndex, SnapshotError> {
    let content = match fs::read_to_string(self.index_path()) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SnapshotIndex::new()),
      Err(e) => return Err(SnapshotError::Read(e)),
    };

    let index: SnapshotIndex = serde_json::from_str(&content).map_err(SnapshotError::Parse)?;

    if index.version != SNAPSHOT_INDEX_VERSION {
      return Err(SnapshotError::UnsupportedVersion(index.version));
    }

    Ok(index)
  }

  /// Write `content` to `path` via a temp file and rename.
  fn write_atomic(&self, path: &Path, content: &str) -> Result<(), SnapshotError> {
    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    fs::write(&temp_path, content).map_err(SnapshotError::Write)?;
    fs::rename(&temp_path, path).map_err(SnapshotError::Write)
  }

  fn save_index(&self, index: &SnapshotIndex) -> Result<(), SnapshotError> {
    self.ensure_dir()?;
    let content = serde_json::to_string_pretty(index).map_err(SnapshotError::Serialize)?;
    self.write_atomic(&self.index_path(), &content)
  }

  /// Load the current snapshot, or `None` if nothing was deployed yet.
  pub fn load_current(&self) -> Result<Option<Snapshot>, SnapshotError> {
    let index = self.load_index()?;
    match index.current {
      Some(id) => Ok(Some(self.load_snapshot(&id)?)),
      None => Ok(None),
    }
  }

  /// Load a snapshot by ID.
  pub fn load_snapshot(&self, id: &str) -> Result<Snapshot, SnapshotError> {
    let content = fs::read_to_string(self.snapshot_path(id)).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        SnapshotError::NotFound(id.to_string())
      } else {
        SnapshotError::Read(e)
      }
    })?;

    serde_json::from_str(&content).map_err(SnapshotError::Parse)
  }

  /// Save a snapshot and set it as current.
  pub fn save_and_set_current(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    self.ensure_dir()?;

    let content = serde_json::to_string_pretty(snapshot).map_err(SnapshotError::Serialize)?;
    self.write_atomic(&self.snapshot_path(&snapshot.id), &content)?;

    let mut index = self.load_index()?;
    index.add(snapshot.to_metadata());
    index.current = Some(snapshot.id.clone());
    self.save_index(&index)
  }

  /// List all snapshots, oldest first.
  pub fn list(&self) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    Ok(self.load_index()?.snapshots)
  }

  /// Delete a snapshot by ID.
  ///
  /// If the deleted snapshot was current, clears the current pointer.
  pub fn delete_snapshot(&self, id: &str) -> Result<(), SnapshotError> {
    match fs::remove_file(self.snapshot_path(id)) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => return Err(SnapshotError::Write(e)),
    }

    let mut index = self.load_index()?;
    index.remove(id);
    self.save_index(&index)
  }
}

/// Make an org alias or username safe as a directory name.
fn sanitize_alias(alias: &str) -> String {
  let cleaned: String = alias
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
        c
      } else {
        '_'
      }
    })
    .collect();
  match cleaned.as_str() {
    "" | "." | ".." => "_".to_string(),
    _ => cleaned,
  }
}
