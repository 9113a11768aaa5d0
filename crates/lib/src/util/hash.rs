//! Hashing utilities for content-addressed change detection.
//!
//! This module provides:
//! - `ContentHash`: a full 64-character SHA-256 hex digest
//! - `hash_file()`: single file hashing
//! - `hash_bytes()`: arbitrary byte hashing
//! - `hash_entries()`: order-independent combination of keyed hashes

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::HASH_PREFIX_LEN;

/// A full 64-character SHA-256 hash.
///
/// Components, snapshots and packages are all compared by content hash rather
/// than timestamp, so re-saving a file without changing it is not a change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// Short prefix for display.
  pub fn short(&self) -> &str {
    let len = self.0.len().min(HASH_PREFIX_LEN);
    &self.0[..len]
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for ContentHash {
  fn from(value: &str) -> Self {
    ContentHash(value.to_string())
  }
}

/// Error while hashing files.
#[derive(Debug, thiserror::Error)]
pub enum FileHashError {
  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, FileHashError> {
  let read_err = |source| FileHashError::ReadFile {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}

/// Combine `(key, hash)` pairs into one hash, independent of input order.
pub fn hash_entries(mut entries: Vec<(String, ContentHash)>) -> ContentHash {
  entries.sort();

  let mut hasher = Sha256::new();
  for (key, hash) in entries {
    hasher.update(key.as_bytes());
    hasher.update(b":");
    hasher.update(hash.0.as_bytes());
    hasher.update(b"\n");
  }

  ContentHash(format!("{:x}", hasher.finalize()))
}

/// Render a relative path with `/` separators.
pub fn normalize_rel_path(path: &Path) -> String {
  path
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
