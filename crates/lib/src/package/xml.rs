//! Metadata API manifest rendering (`package.xml`, `destructiveChanges.xml`).

use std::fmt::Write;

use crate::metadata::ComponentId;

const METADATA_NS: &str = "http://soap.sforce.com/2006/04/metadata";

/// Render a `<Package>` manifest.
///
/// Types appear in the order their first member appears in `ids`; members
/// keep their relative order.
pub fn render_package(ids: &[ComponentId], api_version: &str) -> String {
  let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
  for id in ids {
    let (type_name, api_name) = (id.type_name.as_str(), id.api_name.as_str());
    match groups.iter_mut().find(|(t, _)| *t == type_name) {
      Some((_, members)) => members.push(api_name),
      None => groups.push((type_name, vec![api_name])),
    }
  }

  let mut out = String::new();
  out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
  let _ = writeln!(out, "<Package xmlns=\"{}\">", METADATA_NS);
  for (type_name, members) in groups {
    out.push_str("    <types>\n");
    for member in members {
      let _ = writeln!(out, "        <members>{}</members>", escape(member));
    }
    let _ = writeln!(out, "        <name>{}</name>", escape(type_name));
    out.push_str("    </types>\n");
  }
  let _ = writeln!(out, "    <version>{}</version>", escape(api_version));
  out.push_str("</Package>\n");
  out
}

fn escape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&apos;"),
      _ => out.push(c),
    }
  }
  out
}
