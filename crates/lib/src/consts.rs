//! Crate-wide constants.

/// Application name, used for data and config directory names.
pub const APP_NAME: &str = "sfdelta";

/// Config file looked up in the project root.
pub const CONFIG_FILENAME: &str = "sfdelta.toml";

/// Salesforce DX project descriptor.
pub const SFDX_PROJECT_FILENAME: &str = "sfdx-project.json";

/// Metadata API version used when rendering package manifests.
pub const DEFAULT_API_VERSION: &str = "62.0";

/// Length of the hash prefix shown in human-readable output and snapshot ids.
pub const HASH_PREFIX_LEN: usize = 12;

/// Default seconds between job status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Default seconds to wait for a job to reach a terminal state.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 1800;

/// Default total attempts for an org manifest fetch.
pub const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 4;

/// Default delay before the first fetch retry.
pub const DEFAULT_FETCH_INITIAL_BACKOFF_MS: u64 = 500;

/// Upper bound on a single fetch backoff delay.
pub const DEFAULT_FETCH_MAX_BACKOFF_MS: u64 = 8_000;
