//! Implementation of the `sfd package` command.
//!
//! Assembles the delta package for an org. With `--out` the package is
//! written as a deployable directory: `package.xml`, an optional
//! `destructiveChanges.xml` and the payload files at their project paths.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use sfdelta_lib::package::DeployPackage;
use tracing::info;

use super::{Context, block_on_cancellable};
use crate::output::{print_info, print_json, print_removed, print_stat, print_success, truncate_hash};

pub fn cmd_package(ctx: Context, org: &str, out: Option<&Path>) -> Result<()> {
  let workflow = ctx.workflow()?;
  let plan = block_on_cancellable(|cancel| async move {
    workflow
      .plan(org, &cancel)
      .await
      .with_context(|| format!("Failed to assemble package for {}", org))
  })?;
  let package = &plan.package;

  if let Some(dir) = out {
    write_package(package, &ctx.config.api_version, dir)?;
  }

  if ctx.output.is_json() {
    return print_json(package);
  }

  if package.is_empty() {
    print_info("Nothing to deploy.");
    return Ok(());
  }

  println!("Package {} for {}", truncate_hash(&package.content_hash.0), org);
  if !package.manifest.is_empty() {
    println!();
    println!("Deploy (in order):");
    for (position, id) in package.manifest.iter().enumerate() {
      println!("  {:>3}. {}", position + 1, id);
    }
  }
  if !package.destructive.is_empty() {
    println!();
    println!("Delete (in order):");
    for id in &package.destructive {
      print_removed(&id.to_string());
    }
  }
  println!();
  print_stat("Components", &package.manifest.len().to_string());
  print_stat("Deletions", &package.destructive.len().to_string());
  print_stat("Files", &package.files().count().to_string());

  if let Some(dir) = out {
    print_success(&format!("Wrote package to {}", dir.display()));
  }

  Ok(())
}

fn write_package(package: &DeployPackage, api_version: &str, dir: &Path) -> Result<()> {
  fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

  let manifest_path = dir.join("package.xml");
  fs::write(&manifest_path, package.package_xml(api_version))
    .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))?;

  if let Some(xml) = package.destructive_changes_xml(api_version) {
    let destructive_path = dir.join("destructiveChanges.xml");
    fs::write(&destructive_path, xml)
      .with_context(|| format!("Failed to write destructive manifest: {}", destructive_path.display()))?;
  }

  for rel in package.files() {
    let source = package.root.join(rel);
    let target = dir.join(rel);
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(&source, &target).with_context(|| format!("Failed to copy {}", source.display()))?;
  }

  info!(path = %dir.display(), files = package.files().count(), "wrote package");
  Ok(())
}
