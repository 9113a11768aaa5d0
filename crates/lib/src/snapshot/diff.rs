//! Delta computation between two snapshots.
//!
//! This module computes the difference between a reference snapshot (what the
//! target org is believed to hold) and the current snapshot (the local
//! project), determining which components were added, modified or deleted.

use serde::{Deserialize, Serialize};

use crate::metadata::{ComponentId, MetadataComponent};

use super::types::Snapshot;

/// A modified component: the reference version and the current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modified {
  pub old: MetadataComponent,
  pub new: MetadataComponent,
}

impl Modified {
  pub fn id(&self) -> ComponentId {
    self.new.id()
  }
}

/// Difference between a reference snapshot and a current snapshot.
///
/// Every list is sorted by component identity and an identity appears in at
/// most one list. A change set is derived data: it can always be recomputed
/// from the two snapshots it came from.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
  /// Components in current, not in reference.
  pub added: Vec<MetadataComponent>,

  /// Components in both with a different content hash.
  pub modified: Vec<Modified>,

  /// Identities in reference, not in current.
  pub deleted: Vec<ComponentId>,
}

impl ChangeSet {
  /// Returns true if there are no changes.
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
  }

  /// Total number of changed identities.
  pub fn len(&self) -> usize {
    self.added.len() + self.modified.len() + self.deleted.len()
  }

  /// Whether an identity appears anywhere in the change set.
  pub fn contains(&self, id: &ComponentId) -> bool {
    self.added.iter().any(|c| &c.id() == id)
      || self.modified.iter().any(|m| &m.id() == id)
      || self.deleted.contains(id)
  }

  /// Components to deploy: additions and the new side of modifications.
  pub fn upserts(&self) -> impl Iterator<Item = &MetadataComponent> {
    self.added.iter().chain(self.modified.iter().map(|m| &m.new))
  }
}

/// Compute the change set that turns `reference` into `current`.
///
/// # Diff Logic
///
/// - Identities only in `current` → `added`
/// - Identities only in `reference` → `deleted`
/// - Identities in both with differing content hash → `modified`
/// - Identities in both with the same content hash → excluded
///
/// Snapshots are ordered maps, so walking them yields identity order and the
/// result is identical for identical inputs.
pub fn diff(reference: &Snapshot, current: &Snapshot) -> ChangeSet {
  let mut change_set = ChangeSet::default();

  for (id, component) in &current.components {
    match reference.components.get(id) {
      None => change_set.added.push(component.clone()),
      Some(old) if old.content_hash != component.content_hash => change_set.modified.push(Modified {
        old: old.clone(),
        new: component.clone(),
      }),
      Some(_) => {}
    }
  }

  for id in reference.components.keys() {
    if !current.components.contains_key(id) {
      change_set.deleted.push(id.clone());
    }
  }

  change_set
}
