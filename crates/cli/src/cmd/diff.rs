//! Diff command implementation.
//!
//! Compares the local project against the configured reference for an org
//! and displays added/modified/deleted components. Nothing is submitted.

use anyhow::{Context as _, Result};
use owo_colors::{OwoColorize, Stream};
use sfdelta_lib::snapshot::ChangeSet;

use super::{Context, block_on_cancellable};
use crate::output::{print_added, print_info, print_json, print_modified, print_removed, symbols, truncate_hash};

pub fn cmd_diff(ctx: Context, org: &str) -> Result<()> {
  let workflow = ctx.workflow()?;
  let plan = block_on_cancellable(|cancel| async move {
    workflow
      .plan(org, &cancel)
      .await
      .with_context(|| format!("Failed to compute delta for {}", org))
  })?;

  if ctx.output.is_json() {
    let diff_output = serde_json::json!({
      "org": plan.org,
      "referenceSource": plan.reference_source,
      "referenceId": plan.reference_id,
      "changeSet": plan.change_set,
    });
    return print_json(&diff_output);
  }

  println!(
    "Comparing {} ({}) {} local",
    plan.reference_id, plan.reference_source, symbols::ARROW
  );
  println!();
  print_change_set(&plan.change_set);
  Ok(())
}

pub(crate) fn print_change_set(change_set: &ChangeSet) {
  if change_set.is_empty() {
    print_info("No changes.");
    return;
  }

  for component in &change_set.added {
    print_added(&component.id().to_string());
  }
  for modified in &change_set.modified {
    let hashes = format!(
      "({} {} {})",
      truncate_hash(&modified.old.content_hash.0),
      symbols::ARROW,
      truncate_hash(&modified.new.content_hash.0)
    );
    print_modified(&format!(
      "{} {}",
      modified.id(),
      hashes.if_supports_color(Stream::Stdout, |s| s.dimmed())
    ));
  }
  for id in &change_set.deleted {
    print_removed(&id.to_string());
  }

  println!();
  print_info(&format!(
    "{} added, {} modified, {} deleted",
    change_set.added.len(),
    change_set.modified.len(),
    change_set.deleted.len()
  ));
}
