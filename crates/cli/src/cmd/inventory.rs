//! Implementation of the `sfd inventory` command.
//!
//! Scans the local project and lists every classified component with its
//! content hash.

use anyhow::{Context as _, Result};
use serde::Serialize;
use sfdelta_lib::metadata::scan_project;

use super::Context;
use crate::output::{print_info, print_json, truncate_hash};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InventoryItem {
  #[serde(rename = "type")]
  type_name: String,
  name: String,
  content_hash: String,
  files: Vec<String>,
}

pub fn cmd_inventory(ctx: &Context) -> Result<()> {
  let root = &ctx.config.project_root;
  let inventory = scan_project(root).with_context(|| format!("Failed to scan project: {}", root.display()))?;

  let items: Vec<InventoryItem> = inventory
    .snapshot
    .components
    .iter()
    .map(|(id, component)| InventoryItem {
      type_name: component.type_name.clone(),
      name: component.api_name.clone(),
      content_hash: component.content_hash.0.clone(),
      files: inventory
        .files
        .get(id)
        .unwrap_or_default()
        .iter()
        .map(|p| p.display().to_string())
        .collect(),
    })
    .collect();

  if ctx.output.is_json() {
    return print_json(&items);
  }

  if items.is_empty() {
    print_info("No metadata components found");
    return Ok(());
  }

  for item in &items {
    println!(
      "{}:{} {} ({} file{})",
      item.type_name,
      item.name,
      truncate_hash(&item.content_hash),
      item.files.len(),
      if item.files.len() == 1 { "" } else { "s" }
    );
  }
  print_info(&format!("{} component(s)", items.len()));

  Ok(())
}
