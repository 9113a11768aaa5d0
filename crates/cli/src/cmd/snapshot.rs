use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde::Serialize;
use sfdelta_lib::snapshot::SnapshotStore;
use tracing::{debug, info};

use super::Context;
use crate::output::{
  format_age, print_error, print_info, print_json, print_stat, print_success, print_warning, truncate_hash,
};
use crate::prompts::confirm;

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
  /// List the snapshots deployed to an org
  List {
    /// Org alias or username
    #[arg(short = 't', long)]
    target_org: String,
  },

  /// Show the components of a deployed snapshot
  Show {
    #[arg(short = 't', long)]
    target_org: String,

    /// Snapshot ID to show
    id: String,
  },

  /// Delete deployed snapshots
  Delete {
    #[arg(short = 't', long)]
    target_org: String,

    /// Snapshot IDs to delete
    ids: Vec<String>,

    /// Delete snapshots older than this duration (e.g., "7d", "24h", "2w")
    #[arg(long, value_parser = humantime::parse_duration)]
    older_than: Option<Duration>,

    /// Preview what would be deleted without actually deleting
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,
  },
}

#[derive(Debug, Serialize)]
struct DeleteResult {
  deleted: Vec<String>,
  failed: Vec<DeleteFailure>,
  skipped_current: Option<String>,
  dry_run: bool,
}

#[derive(Debug, Serialize)]
struct DeleteFailure {
  id: String,
  error: String,
}

pub fn cmd_snapshot(ctx: &Context, command: SnapshotCommand) -> Result<()> {
  match command {
    SnapshotCommand::List { target_org } => cmd_list(ctx, &target_org),
    SnapshotCommand::Show { target_org, id } => cmd_show(ctx, &target_org, &id),
    SnapshotCommand::Delete {
      target_org,
      ids,
      older_than,
      dry_run,
      force,
    } => cmd_delete(ctx, &target_org, ids, older_than, dry_run, force),
  }
}

fn cmd_list(ctx: &Context, org: &str) -> Result<()> {
  let store = ctx.config.snapshot_store(org);
  let index = store.load_index().context("Failed to load snapshot index")?;
  let current_id = index.current;
  let mut snapshots = index.snapshots;
  snapshots.reverse();

  if ctx.output.is_json() {
    #[derive(Serialize)]
    struct ListOutput {
      org: String,
      current: Option<String>,
      snapshots: Vec<SnapshotListItem>,
    }

    #[derive(Serialize)]
    struct SnapshotListItem {
      id: String,
      captured_at: u64,
      is_current: bool,
      component_count: usize,
      content_hash: String,
    }

    let items = snapshots
      .iter()
      .map(|s| SnapshotListItem {
        id: s.id.clone(),
        captured_at: s.captured_at,
        is_current: current_id.as_ref() == Some(&s.id),
        component_count: s.component_count,
        content_hash: s.content_hash.0.clone(),
      })
      .collect();

    return print_json(&ListOutput {
      org: org.to_string(),
      current: current_id,
      snapshots: items,
    });
  }

  if snapshots.is_empty() {
    print_info(&format!("No snapshots for {}", org));
    return Ok(());
  }

  for snapshot in &snapshots {
    let current_marker = if current_id.as_ref() == Some(&snapshot.id) {
      " (current)"
    } else {
      ""
    };
    println!(
      "{}{} - {} ({} components)",
      snapshot.id,
      current_marker,
      format_age(snapshot.captured_at),
      snapshot.component_count
    );
  }
  print_info(&format!("{} snapshot(s) total", snapshots.len()));

  Ok(())
}

fn cmd_show(ctx: &Context, org: &str, id: &str) -> Result<()> {
  let store = ctx.config.snapshot_store(org);
  let snapshot = store
    .load_snapshot(id)
    .with_context(|| format!("Failed to load snapshot: {}", id))?;
  let is_current = store.load_index()?.current.as_deref() == Some(id);

  if ctx.output.is_json() {
    return print_json(&snapshot);
  }

  let current_marker = if is_current { " (current)" } else { "" };
  println!("Snapshot: {}{}", snapshot.id, current_marker);
  print_stat("Org", org);
  print_stat("Captured", &format_age(snapshot.captured_at));
  print_stat("Components", &snapshot.len().to_string());
  println!();
  for (component_id, component) in &snapshot.components {
    println!("  {} {}", component_id, truncate_hash(&component.content_hash.0));
  }

  Ok(())
}

fn cmd_delete(
  ctx: &Context,
  org: &str,
  ids: Vec<String>,
  older_than: Option<Duration>,
  dry_run: bool,
  force: bool,
) -> Result<()> {
  let store = ctx.config.snapshot_store(org);
  let index = store.load_index().context("Failed to load snapshot index")?;

  let mut candidates: Vec<String> = ids;
  if let Some(duration) = older_than {
    let now = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs())
      .unwrap_or(0);
    let cutoff = now.saturating_sub(duration.as_secs());

    for snapshot in &index.snapshots {
      if snapshot.captured_at < cutoff && !candidates.contains(&snapshot.id) {
        candidates.push(snapshot.id.clone());
      }
    }
  }

  let mut skipped_current: Option<String> = None;
  if let Some(ref current) = index.current
    && candidates.contains(current)
  {
    skipped_current = Some(current.clone());
    candidates.retain(|id| id != current);
  }

  if candidates.is_empty() {
    if ctx.output.is_json() {
      print_json(&DeleteResult {
        deleted: vec![],
        failed: vec![],
        skipped_current,
        dry_run,
      })?;
    } else if skipped_current.is_some() {
      print_warning("Cannot delete the current snapshot; it is the reference for the next deploy.");
    } else {
      print_info("No snapshots to delete");
    }
    return Ok(());
  }

  if !ctx.output.is_json() {
    if dry_run {
      print_info("Dry run - the following snapshots would be deleted:");
    } else {
      println!("The following snapshots will be deleted:");
    }
    for id in &candidates {
      println!("  {}", id);
    }
    if let Some(ref current) = skipped_current {
      print_warning(&format!("Skipping current snapshot: {}", current));
    }
  }

  if dry_run {
    if ctx.output.is_json() {
      print_json(&DeleteResult {
        deleted: candidates,
        failed: vec![],
        skipped_current,
        dry_run: true,
      })?;
    } else {
      print_info("Dry run - no changes made");
    }
    return Ok(());
  }

  if !confirm(&format!("Delete {} snapshot(s)?", candidates.len()), force)? {
    print_info("Cancelled");
    return Ok(());
  }

  let (deleted, failed) = delete_all(&store, candidates);

  if ctx.output.is_json() {
    print_json(&DeleteResult {
      deleted,
      failed,
      skipped_current,
      dry_run: false,
    })?;
  } else {
    if !deleted.is_empty() {
      print_success(&format!("Deleted {} snapshot(s)", deleted.len()));
    }
    for f in &failed {
      print_error(&format!("Failed to delete {}: {}", f.id, f.error));
    }
  }

  Ok(())
}

fn delete_all(store: &SnapshotStore, ids: Vec<String>) -> (Vec<String>, Vec<DeleteFailure>) {
  let mut deleted = Vec::new();
  let mut failed = Vec::new();

  for id in ids {
    debug!(snapshot_id = %id, "deleting snapshot");
    match store.delete_snapshot(&id) {
      Ok(()) => {
        info!(snapshot_id = %id, "deleted snapshot");
        deleted.push(id);
      }
      Err(e) => failed.push(DeleteFailure {
        id,
        error: e.to_string(),
      }),
    }
  }

  (deleted, failed)
}
