//! In-memory transport driven by scripted responses.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::transport::{FailureKind, Operation, OrgRequest, OrgResponse, OrgTransport, TransportError};

/// Replays queued responses per operation and records every request.
///
/// The last response queued for an operation is repeated once the others
/// are used up, so a single `InProgress` status models a job that never
/// finishes. Operations with nothing queued are rejected.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
  scripts: Mutex<HashMap<Operation, VecDeque<OrgResponse>>>,
  calls: Mutex<Vec<OrgRequest>>,
}

impl ScriptedTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a response for an operation.
  pub fn on(self, operation: Operation, response: OrgResponse) -> Self {
    self.push(operation, response);
    self
  }

  pub fn on_ok(self, operation: Operation, output: Value) -> Self {
    self.on(operation, OrgResponse::ok(output))
  }

  pub fn on_failure(self, operation: Operation, kind: FailureKind, name: &str, message: &str) -> Self {
    self.on(operation, OrgResponse::failure(kind, name, message))
  }

  pub fn push(&self, operation: Operation, response: OrgResponse) {
    if let Ok(mut scripts) = self.scripts.lock() {
      scripts.entry(operation).or_default().push_back(response);
    }
  }

  /// Every request received so far.
  pub fn calls(&self) -> Vec<OrgRequest> {
    self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
  }

  pub fn calls_for(&self, operation: Operation) -> Vec<OrgRequest> {
    self.calls().into_iter().filter(|c| c.operation == operation).collect()
  }

  fn next(&self, operation: Operation) -> Option<OrgResponse> {
    let mut scripts = self.scripts.lock().ok()?;
    let queue = scripts.get_mut(&operation)?;
    if queue.len() > 1 {
      queue.pop_front()
    } else {
      queue.front().cloned()
    }
  }
}

#[async_trait]
impl OrgTransport for ScriptedTransport {
  async fn call(&self, request: OrgRequest) -> Result<OrgResponse, TransportError> {
    let operation = request.operation;
    if let Ok(mut calls) = self.calls.lock() {
      calls.push(request);
    }
    Ok(self.next(operation).unwrap_or_else(|| {
      OrgResponse::failure(
        FailureKind::Rejected,
        "UnscriptedOperation",
        format!("no response scripted for {}", operation),
      )
    }))
  }
}
