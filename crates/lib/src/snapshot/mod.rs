//! Metadata snapshots: capture, delta computation and deployed history.

mod diff;
mod storage;
mod types;

pub use diff::{ChangeSet, Modified, diff};
pub use storage::SnapshotStore;
pub use types::{
  SNAPSHOT_INDEX_VERSION, Snapshot, SnapshotError, SnapshotIndex, SnapshotMetadata, SnapshotSource, generate_snapshot_id,
};
pub(crate) use types::now_secs;
