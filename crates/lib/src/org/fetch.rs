//! Org snapshot fetching with bounded retries.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::consts::{DEFAULT_FETCH_INITIAL_BACKOFF_MS, DEFAULT_FETCH_MAX_ATTEMPTS, DEFAULT_FETCH_MAX_BACKOFF_MS};
use crate::metadata::MetadataComponent;
use crate::snapshot::{Snapshot, SnapshotSource};
use crate::util::hash::ContentHash;

use super::transport::{ManifestQuery, Operation, OrgRequest, OrgTransport, TransportError};

/// Retry budget for fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first.
  pub max_attempts: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
      initial_backoff: Duration::from_millis(DEFAULT_FETCH_INITIAL_BACKOFF_MS),
      max_backoff: Duration::from_millis(DEFAULT_FETCH_MAX_BACKOFF_MS),
    }
  }
}

impl RetryPolicy {
  /// Delay after failed attempt `attempt` (1-based).
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
  }
}

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("org '{alias}' unavailable after {attempts} attempt(s): {last_error}")]
  OrgUnavailable {
    alias: String,
    attempts: u32,
    last_error: String,
  },

  #[error("malformed manifest from org '{alias}': {message}")]
  Malformed { alias: String, message: String },

  #[error("fetch from org '{alias}' cancelled")]
  Cancelled { alias: String },

  #[error("transport failure fetching from org '{alias}': {source}")]
  Transport {
    alias: String,
    #[source]
    source: TransportError,
  },
}

#[derive(Debug, Deserialize)]
struct ManifestOutput {
  components: Vec<RemoteComponent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteComponent {
  #[serde(rename = "type")]
  type_name: String,
  full_name: String,
  content_hash: String,
  #[serde(default)]
  last_modified: u64,
}

/// Fetch the current metadata manifest of an org as a snapshot.
///
/// Transient and auth failures are retried with exponential backoff until
/// the policy's attempts are used up. A rejected request is not retried.
/// Read-only with respect to the org.
pub async fn fetch_org_snapshot(
  transport: &dyn OrgTransport,
  alias: &str,
  types: &[String],
  policy: &RetryPolicy,
  cancel: &CancellationToken,
) -> Result<Snapshot, FetchError> {
  let request = OrgRequest::new(
    alias,
    Operation::RetrieveManifest,
    &ManifestQuery { types: types.to_vec() },
  )
  .map_err(|source| FetchError::Transport {
    alias: alias.to_string(),
    source,
  })?;

  let max_attempts = policy.max_attempts.max(1);
  let mut last_error = String::new();

  for attempt in 1..=max_attempts {
    let response = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(FetchError::Cancelled { alias: alias.to_string() }),
      result = transport.call(request.clone()) => result.map_err(|source| FetchError::Transport {
        alias: alias.to_string(),
        source,
      })?,
    };

    let detail = match response.output {
      Ok(output) => {
        let snapshot = normalize(alias, output)?;
        info!(org = %alias, components = snapshot.len(), attempt, "org manifest fetched");
        return Ok(snapshot);
      }
      Err(detail) => detail,
    };

    if !detail.is_retryable() {
      return Err(FetchError::OrgUnavailable {
        alias: alias.to_string(),
        attempts: attempt,
        last_error: detail.to_string(),
      });
    }
    last_error = detail.to_string();

    if attempt == max_attempts {
      break;
    }

    let delay = policy.backoff(attempt);
    warn!(org = %alias, attempt, error = %detail, delay_ms = delay.as_millis() as u64, "fetch failed, retrying");
    tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(FetchError::Cancelled { alias: alias.to_string() }),
      _ = tokio::time::sleep(delay) => {}
    }
  }

  Err(FetchError::OrgUnavailable {
    alias: alias.to_string(),
    attempts: max_attempts,
    last_error,
  })
}

fn normalize(alias: &str, output: Value) -> Result<Snapshot, FetchError> {
  let malformed = |message: String| FetchError::Malformed {
    alias: alias.to_string(),
    message,
  };

  let manifest: ManifestOutput = serde_json::from_value(output).map_err(|e| malformed(e.to_string()))?;

  let mut components = Vec::with_capacity(manifest.components.len());
  let mut seen = BTreeSet::new();
  for remote in manifest.components {
    if remote.type_name.is_empty() || remote.full_name.is_empty() {
      return Err(malformed("component with empty type or name".to_string()));
    }
    let component = MetadataComponent {
      type_name: remote.type_name,
      api_name: remote.full_name,
      content_hash: ContentHash(remote.content_hash),
      last_modified: remote.last_modified,
    };
    if !seen.insert(component.id()) {
      return Err(malformed(format!("component {} listed more than once", component.id())));
    }
    components.push(component);
  }

  Ok(Snapshot::new(
    SnapshotSource::Org {
      alias: alias.to_string(),
    },
    components,
  ))
}
