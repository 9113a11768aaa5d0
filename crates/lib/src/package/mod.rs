//! Deploy package assembly.
//!
//! Turns a change set into an ordered, hashed package: the manifest of
//! components to upsert in dependency order, the destructive list in reverse
//! dependency order, and the local files backing each manifest entry.

mod xml;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::metadata::{ComponentId, InventoryError, LocalFiles, scan_project};
use crate::order::DependencyTable;
use crate::snapshot::ChangeSet;
use crate::util::hash::{ContentHash, hash_bytes};

pub use xml::render_package;

#[derive(Debug, Error)]
pub enum PackageError {
  /// Manifest components with no backing local files.
  #[error("no local files for: {}", .ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", "))]
  MissingFiles { ids: Vec<ComponentId> },
}

/// An immutable, deployable package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployPackage {
  /// Components to deploy, prerequisites first.
  pub manifest: Vec<ComponentId>,
  /// Components to delete, dependents first.
  pub destructive: Vec<ComponentId>,
  /// Project root the payload paths are relative to.
  pub root: PathBuf,
  pub payload: BTreeMap<ComponentId, Vec<PathBuf>>,
  /// Content hash of each manifest component at assembly time.
  pub component_hashes: BTreeMap<ComponentId, ContentHash>,
  pub content_hash: ContentHash,
}

impl DeployPackage {
  pub fn is_empty(&self) -> bool {
    self.manifest.is_empty() && self.destructive.is_empty()
  }

  pub fn len(&self) -> usize {
    self.manifest.len() + self.destructive.len()
  }

  /// Payload files relative to the project root, in manifest order.
  pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
    self
      .manifest
      .iter()
      .filter_map(|id| self.payload.get(id))
      .flat_map(|files| files.iter())
  }

  /// `package.xml` for the manifest.
  pub fn package_xml(&self, api_version: &str) -> String {
    render_package(&self.manifest, api_version)
  }

  /// `destructiveChanges.xml`, or `None` when nothing is deleted.
  pub fn destructive_changes_xml(&self, api_version: &str) -> Option<String> {
    (!self.destructive.is_empty()).then(|| render_package(&self.destructive, api_version))
  }

  /// Package hash recomputed from the payload as it reads on disk now.
  ///
  /// Differs from `content_hash` once a manifest component is edited or
  /// removed after assembly.
  pub fn current_hash(&self) -> Result<ContentHash, InventoryError> {
    let inventory = scan_project(&self.root)?;
    let upserts: Vec<(ComponentId, ContentHash)> = self
      .manifest
      .iter()
      .map(|id| {
        let hash = inventory
          .snapshot
          .get(id)
          .map(|c| c.content_hash.clone())
          .unwrap_or_else(|| ContentHash(String::new()));
        (id.clone(), hash)
      })
      .collect();
    Ok(package_hash(&upserts, &self.destructive))
  }
}

/// Assemble a package from a change set.
///
/// Manifest entries are ordered by `(rank, identity)` and deletions by
/// `(rank descending, identity)`. Types unknown to `table` rank last and fall
/// back to identity order, so the result is reproducible.
///
/// # Errors
///
/// Returns `MissingFiles` if a manifest component has no local files.
pub fn assemble(
  change_set: &ChangeSet,
  local_files: &LocalFiles,
  table: &DependencyTable,
) -> Result<DeployPackage, PackageError> {
  let mut upserts: Vec<(ComponentId, ContentHash)> = change_set
    .upserts()
    .map(|c| (c.id(), c.content_hash.clone()))
    .collect();
  upserts.sort_by(|(a, _), (b, _)| table.rank(&a.type_name).cmp(&table.rank(&b.type_name)).then_with(|| a.cmp(b)));

  let mut destructive = change_set.deleted.clone();
  destructive.sort_by(|a, b| table.rank(&b.type_name).cmp(&table.rank(&a.type_name)).then_with(|| a.cmp(b)));

  let mut payload = BTreeMap::new();
  let mut missing = Vec::new();
  for (id, _) in &upserts {
    match local_files.get(id) {
      Some(files) if !files.is_empty() => {
        payload.insert(id.clone(), files.to_vec());
      }
      _ => missing.push(id.clone()),
    }
  }
  if !missing.is_empty() {
    missing.sort();
    return Err(PackageError::MissingFiles { ids: missing });
  }

  let content_hash = package_hash(&upserts, &destructive);
  let manifest: Vec<ComponentId> = upserts.iter().map(|(id, _)| id.clone()).collect();

  for id in manifest.iter().filter(|id| !table.is_known(&id.type_name)) {
    debug!(component = %id, "type not in dependency order, placed last");
  }

  info!(
    manifest = manifest.len(),
    destructive = destructive.len(),
    hash = %content_hash.short(),
    "package assembled"
  );

  Ok(DeployPackage {
    manifest,
    destructive,
    root: local_files.root.clone(),
    payload,
    component_hashes: upserts.into_iter().collect(),
    content_hash,
  })
}

/// Hash over the ordered manifest entries with their hashes, then deletions.
fn package_hash(upserts: &[(ComponentId, ContentHash)], destructive: &[ComponentId]) -> ContentHash {
  let mut content = String::new();
  for (id, hash) in upserts {
    content.push_str(&format!("+{}:{}\n", id, hash.0));
  }
  for id in destructive {
    content.push_str(&format!("-{}\n", id));
  }
  hash_bytes(content.as_bytes())
}
