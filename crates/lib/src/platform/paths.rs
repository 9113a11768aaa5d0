use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Overrides the data directory (snapshot history), mainly for tests and CI.
pub const DATA_DIR_ENV: &str = "SFDELTA_DATA_DIR";

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
    return PathBuf::from(dir);
  }
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
    return PathBuf::from(dir);
  }
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the root directory for per-org deployed snapshot history
pub fn snapshots_dir() -> PathBuf {
  data_dir().join("snapshots")
}
