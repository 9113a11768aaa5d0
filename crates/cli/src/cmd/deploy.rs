//! Implementation of the `sfd deploy` command.
//!
//! Runs the full pipeline for one org: compute the delta, validate it, and
//! deploy only if validation passed for exactly that package. A successful
//! deploy records the local state as the org's new reference snapshot.

use anyhow::{Context as _, Result, bail};
use sfdelta_lib::job::DeployOutcome;
use sfdelta_lib::workflow::{RunOutcome, RunReport};

use super::diff::print_change_set;
use super::validate::outcome_label;
use super::{Context, block_on_cancellable};
use crate::output::{
  format_duration, print_error, print_info, print_job_details, print_json, print_stat, print_success, print_warning,
  truncate_hash,
};

pub fn cmd_deploy(ctx: Context, org: &str, quick: bool) -> Result<()> {
  let workflow = ctx.workflow()?;
  let report = block_on_cancellable(|cancel| async move {
    workflow
      .run(org, quick, &cancel)
      .await
      .with_context(|| format!("Deploy to {} failed", org))
  })?;

  if ctx.output.is_json() {
    print_json(&report)?;
  } else {
    print_run_report(org, &report);
  }

  if !report.outcome.is_success() {
    bail!("Deploy to {} did not complete: {}", org, run_outcome_label(report.outcome));
  }
  Ok(())
}

fn print_run_report(org: &str, report: &RunReport) {
  print_change_set(&report.plan.change_set);
  if report.outcome == RunOutcome::NothingToDeploy {
    return;
  }
  println!();
  print_stat("Package", truncate_hash(&report.plan.package.content_hash.0));

  if let Some(validation) = &report.validation {
    let summary = format!(
      "{}: validation {} ({}, job {})",
      org,
      outcome_label(validation.outcome),
      format_duration(validation.elapsed),
      validation.job.job_id
    );
    if validation.passed() {
      print_success(&summary);
    } else {
      print_warning(&summary);
    }
    print_job_details(&validation.job);
  }

  if let Some(deploy) = &report.deploy {
    let summary = format!(
      "{}: {}deploy {} ({}, job {})",
      org,
      if deploy.quick { "quick " } else { "" },
      deploy_label(deploy.outcome),
      format_duration(deploy.elapsed),
      deploy.job.job_id
    );
    match deploy.outcome {
      DeployOutcome::Succeeded => print_success(&summary),
      DeployOutcome::Failed => print_error(&summary),
      _ => print_warning(&summary),
    }
    print_job_details(&deploy.job);
    if deploy.succeeded() {
      print_info(&format!("Recorded snapshot {}", report.plan.local.id));
    }
  }
}

fn deploy_label(outcome: DeployOutcome) -> &'static str {
  match outcome {
    DeployOutcome::Succeeded => "succeeded",
    DeployOutcome::SucceededWithWarnings => "succeeded with warnings",
    DeployOutcome::Failed => "failed",
    DeployOutcome::TimedOut => "timed out",
    DeployOutcome::Aborted => "aborted",
  }
}

fn run_outcome_label(outcome: RunOutcome) -> &'static str {
  match outcome {
    RunOutcome::NothingToDeploy => "nothing to deploy",
    RunOutcome::Deployed => "deployed",
    RunOutcome::ValidationFailed => "validation failed",
    RunOutcome::DeployFailed => "deploy failed",
    RunOutcome::TimedOut => "timed out",
    RunOutcome::Aborted => "aborted",
  }
}
