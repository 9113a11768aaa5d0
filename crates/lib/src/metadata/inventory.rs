//! Local project inventory.
//!
//! Walks the package directories of a Salesforce DX project, groups files
//! into metadata components and hashes each component by content. The scan
//! touches only the filesystem and is deterministic for a fixed tree.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::consts::SFDX_PROJECT_FILENAME;
use crate::snapshot::{Snapshot, SnapshotSource};
use crate::util::hash::{ContentHash, FileHashError, hash_entries, hash_file, normalize_rel_path};

use super::registry::{Classification, Classified, Unregistered, classify, unregistered_type};
use super::types::{ComponentId, MetadataComponent};

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "__tests__"];

/// Errors from scanning a project.
#[derive(Debug, Error)]
pub enum InventoryError {
  /// A file or directory could not be read.
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A metadata file whose type or name cannot be determined.
  #[error("invalid metadata file {path}: {message}")]
  Format { path: PathBuf, message: String },
}

impl InventoryError {
  fn io(path: &Path, source: io::Error) -> Self {
    InventoryError::Io {
      path: path.to_path_buf(),
      source,
    }
  }

  fn format(path: &Path, message: impl Into<String>) -> Self {
    InventoryError::Format {
      path: path.to_path_buf(),
      message: message.into(),
    }
  }
}

impl From<FileHashError> for InventoryError {
  fn from(err: FileHashError) -> Self {
    match err {
      FileHashError::ReadFile { path, source } => InventoryError::Io { path, source },
    }
  }
}

/// Files backing each local component, relative to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFiles {
  pub root: PathBuf,
  pub files: BTreeMap<ComponentId, Vec<PathBuf>>,
}

impl LocalFiles {
  pub fn get(&self, id: &ComponentId) -> Option<&[PathBuf]> {
    self.files.get(id).map(Vec::as_slice)
  }
}

/// Result of scanning a project: the local snapshot and its file index.
#[derive(Debug, Clone)]
pub struct Inventory {
  pub snapshot: Snapshot,
  pub files: LocalFiles,
}

/// Subset of `sfdx-project.json` the scanner needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SfdxProject {
  package_directories: Vec<PackageDirectory>,
}

#[derive(Debug, Deserialize)]
struct PackageDirectory {
  path: String,
}

/// Files collected for one component during the walk.
#[derive(Debug, Default)]
struct Pending {
  /// (path relative to the metadata root, file hash)
  entries: Vec<(String, ContentHash)>,
  /// Paths relative to the project root.
  files: Vec<PathBuf>,
  last_modified: u64,
}

/// Scan a project and produce a local snapshot.
///
/// Package directories come from `sfdx-project.json`; without one the root
/// itself is scanned.
///
/// # Errors
///
/// - `Io` if the root, a package directory or a file cannot be read
/// - `Format` if the project descriptor or a `-meta.xml` file is malformed,
///   or a `-meta.xml` file declares a root element other than its type
pub fn scan_project(root: &Path) -> Result<Inventory, InventoryError> {
  let root = dunce::canonicalize(root).map_err(|e| InventoryError::io(root, e))?;
  fs::read_dir(&root).map_err(|e| InventoryError::io(&root, e))?;

  let package_dirs = package_directories(&root)?;
  info!(root = %root.display(), packages = package_dirs.len(), "scanning project");

  let mut pending: BTreeMap<ComponentId, Pending> = BTreeMap::new();
  for package_dir in &package_dirs {
    scan_package_dir(&root, package_dir, &mut pending)?;
  }

  let mut files = BTreeMap::new();
  let mut components = Vec::with_capacity(pending.len());
  for (id, mut p) in pending {
    p.files.sort();
    components.push(MetadataComponent {
      type_name: id.type_name.clone(),
      api_name: id.api_name.clone(),
      content_hash: hash_entries(p.entries),
      last_modified: p.last_modified,
    });
    files.insert(id, p.files);
  }

  info!(components = components.len(), "scan complete");

  Ok(Inventory {
    snapshot: Snapshot::new(SnapshotSource::Local, components),
    files: LocalFiles { root, files },
  })
}

/// Resolve package directories declared by `sfdx-project.json`.
fn package_directories(root: &Path) -> Result<Vec<PathBuf>, InventoryError> {
  let descriptor = root.join(SFDX_PROJECT_FILENAME);
  let content = match fs::read_to_string(&descriptor) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![root.to_path_buf()]),
    Err(e) => return Err(InventoryError::io(&descriptor, e)),
  };

  let project: SfdxProject =
    serde_json::from_str(&content).map_err(|e| InventoryError::format(&descriptor, e.to_string()))?;

  if project.package_directories.is_empty() {
    return Err(InventoryError::format(&descriptor, "no packageDirectories declared"));
  }

  Ok(
    project
      .package_directories
      .into_iter()
      .map(|dir| root.join(dir.path))
      .collect(),
  )
}

fn is_skipped(entry: &DirEntry) -> bool {
  if entry.depth() == 0 {
    return false;
  }
  let name = entry.file_name().to_string_lossy();
  name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
}

fn scan_package_dir(
  root: &Path,
  package_dir: &Path,
  pending: &mut BTreeMap<ComponentId, Pending>,
) -> Result<(), InventoryError> {
  if !package_dir.is_dir() {
    return Err(InventoryError::io(
      package_dir,
      io::Error::new(io::ErrorKind::NotFound, "package directory not found"),
    ));
  }

  let walker = WalkDir::new(package_dir)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| !is_skipped(e));

  for entry in walker {
    let entry = entry.map_err(|e| {
      let path = e.path().unwrap_or(package_dir).to_path_buf();
      let source = e.into_io_error().unwrap_or_else(|| io::Error::other("filesystem loop"));
      InventoryError::Io { path, source }
    })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let path = entry.path();
    let rel_to_package = path.strip_prefix(package_dir).unwrap_or(path);
    let (id, metadata_root) = match classify(rel_to_package) {
      None => continue,
      Some(Classification::Known(Classified {
        id,
        metadata_root,
        expected_root,
      })) => {
        if let Some(expected) = expected_root {
          check_meta_xml(path, &expected)?;
        }
        (id, metadata_root)
      }
      Some(Classification::Unregistered(Unregistered {
        name,
        suffix,
        metadata_root,
      })) => {
        let root_element = meta_root_element(path)?;
        let type_name = unregistered_type(&root_element, &suffix);
        debug!(file = %path.display(), type_name = %type_name, "type read from XML root");
        (ComponentId::new(type_name, name), metadata_root)
      }
    };

    let key_root = package_dir.join(&metadata_root);
    let key = normalize_rel_path(path.strip_prefix(&key_root).unwrap_or(rel_to_package));
    let file_hash = hash_file(path)?;
    let modified = modified_secs(&entry).map_err(|e| InventoryError::io(path, e))?;

    debug!(component = %id, file = %key, "classified file");

    let slot = pending.entry(id).or_default();
    slot.entries.push((key, file_hash));
    slot.files.push(path.strip_prefix(root).unwrap_or(path).to_path_buf());
    slot.last_modified = slot.last_modified.max(modified);
  }

  Ok(())
}

/// Local name of a `-meta.xml` file's root element.
fn meta_root_element(path: &Path) -> Result<String, InventoryError> {
  let content = fs::read_to_string(path).map_err(|e| InventoryError::io(path, e))?;
  let doc = roxmltree::Document::parse(&content).map_err(|e| InventoryError::format(path, e.to_string()))?;
  Ok(doc.root_element().tag_name().name().to_string())
}

/// Parse a `-meta.xml` file and check its root element.
fn check_meta_xml(path: &Path, expected_root: &str) -> Result<(), InventoryError> {
  let actual = meta_root_element(path)?;
  if actual != expected_root {
    return Err(InventoryError::format(
      path,
      format!("expected <{}> root element, found <{}>", expected_root, actual),
    ));
  }
  Ok(())
}

fn modified_secs(entry: &DirEntry) -> io::Result<u64> {
  let modified = entry.metadata().map_err(io::Error::other)?.modified()?;
  Ok(modified.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0))
}
