//! Implementation of the `sfd validate` command.
//!
//! Runs a check-only deploy of the delta against each target org. Orgs are
//! independent, so they are validated concurrently on a `JoinSet`; nothing
//! is persisted in any org.

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use serde::Serialize;
use sfdelta_lib::job::{ValidationOutcome, ValidationReport};
use sfdelta_lib::workflow::{Workflow, WorkflowError};
use tokio::task::JoinSet;
use tracing::info;

use super::{Context, block_on_cancellable};
use crate::output::{
  format_duration, print_error, print_info, print_job_details, print_json, print_success, print_warning,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrgValidation {
  org: String,
  /// `None` when the delta is empty and nothing was submitted.
  report: Option<ValidationReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
}

impl OrgValidation {
  fn passed(&self) -> bool {
    self.error.is_none() && self.report.as_ref().is_none_or(|r| r.passed())
  }
}

pub fn cmd_validate(ctx: Context, orgs: Vec<String>) -> Result<()> {
  let table = Arc::new(ctx.config.validate().context("Invalid config")?);
  let transport = ctx.transport();
  let config = &ctx.config;

  let mut results = block_on_cancellable(|cancel| async move {
    let mut tasks = JoinSet::new();
    for org in orgs {
      let workflow = Workflow::with_table(config.clone(), table.clone(), transport.clone());
      let cancel = cancel.clone();
      tasks.spawn(async move {
        let result = validate_org(&workflow, &org, &cancel).await;
        (org, result)
      });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
      let (org, result) = joined.context("Validation task panicked")?;
      results.push(match result {
        Ok(report) => OrgValidation {
          org,
          report,
          error: None,
        },
        Err(e) => OrgValidation {
          org,
          report: None,
          error: Some(e.to_string()),
        },
      });
    }
    Ok(results)
  })?;
  results.sort_by(|a, b| a.org.cmp(&b.org));

  if ctx.output.is_json() {
    print_json(&results)?;
  } else {
    for result in &results {
      print_org_validation(result);
    }
  }

  let failed: Vec<&str> = results.iter().filter(|r| !r.passed()).map(|r| r.org.as_str()).collect();
  if !failed.is_empty() {
    bail!("Validation did not pass for: {}", failed.join(", "));
  }
  Ok(())
}

async fn validate_org(
  workflow: &Workflow,
  org: &str,
  cancel: &tokio_util::sync::CancellationToken,
) -> Result<Option<ValidationReport>, WorkflowError> {
  let plan = workflow.plan(org, cancel).await?;
  if plan.package.is_empty() {
    info!(org = %org, "nothing to validate");
    return Ok(None);
  }
  workflow.validate(org, &plan, cancel).await.map(Some)
}

fn print_org_validation(result: &OrgValidation) {
  if let Some(error) = &result.error {
    print_error(&format!("{}: {}", result.org, error));
    return;
  }
  let Some(report) = &result.report else {
    print_info(&format!("{}: nothing to validate", result.org));
    return;
  };

  let summary = format!(
    "{}: validation {} ({}, job {})",
    result.org,
    outcome_label(report.outcome),
    format_duration(report.elapsed),
    report.job.job_id
  );
  match report.outcome {
    ValidationOutcome::Passed => print_success(&summary),
    ValidationOutcome::PassedWithWarnings | ValidationOutcome::TimedOut | ValidationOutcome::Aborted => {
      print_warning(&summary)
    }
    ValidationOutcome::Failed => print_error(&summary),
  }
  print_job_details(&report.job);
}

pub(crate) fn outcome_label(outcome: ValidationOutcome) -> &'static str {
  match outcome {
    ValidationOutcome::Passed => "passed",
    ValidationOutcome::PassedWithWarnings => "passed with warnings",
    ValidationOutcome::Failed => "failed",
    ValidationOutcome::TimedOut => "timed out",
    ValidationOutcome::Aborted => "aborted",
  }
}
