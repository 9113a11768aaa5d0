//! Mapping from Salesforce source-format file paths to metadata components.
//!
//! The registry is static data: suffix → type for single-file and
//! source-plus-meta components, child folders under `objects/<Object>/` for
//! object children, and directory bundles (LWC, Aura, expanded static
//! resources) whose every file belongs to one component. Other `-meta.xml`
//! files are reported as unregistered and typed by their XML root element.

use std::path::{Path, PathBuf};

use super::types::ComponentId;

/// A top-level type identified by file suffix.
#[derive(Debug, Clone, Copy)]
struct SuffixType {
  /// Suffix without the leading dot or trailing `-meta.xml`, e.g. `cls`.
  suffix: &'static str,
  type_name: &'static str,
  /// Folder the type lives in, e.g. `classes`.
  folder: &'static str,
  /// Whether a bare `<name>.<suffix>` source file accompanies the meta file.
  has_source: bool,
}

const fn suffix_type(suffix: &'static str, type_name: &'static str, folder: &'static str, has_source: bool) -> SuffixType {
  SuffixType {
    suffix,
    type_name,
    folder,
    has_source,
  }
}

const SUFFIX_TYPES: &[SuffixType] = &[
  suffix_type("cls", "ApexClass", "classes", true),
  suffix_type("trigger", "ApexTrigger", "triggers", true),
  suffix_type("page", "ApexPage", "pages", true),
  suffix_type("component", "ApexComponent", "components", true),
  suffix_type("resource", "StaticResource", "staticresources", true),
  suffix_type("object", "CustomObject", "objects", false),
  suffix_type("flow", "Flow", "flows", false),
  suffix_type("permissionset", "PermissionSet", "permissionsets", false),
  suffix_type("permissionsetgroup", "PermissionSetGroup", "permissionsetgroups", false),
  suffix_type("profile", "Profile", "profiles", false),
  suffix_type("layout", "Layout", "layouts", false),
  suffix_type("tab", "CustomTab", "tabs", false),
  suffix_type("app", "CustomApplication", "applications", false),
  suffix_type("flexipage", "FlexiPage", "flexipages", false),
  suffix_type("labels", "CustomLabels", "labels", false),
  suffix_type("md", "CustomMetadata", "customMetadata", false),
  suffix_type("globalValueSet", "GlobalValueSet", "globalValueSets", false),
  suffix_type("customPermission", "CustomPermission", "customPermissions", false),
  suffix_type("quickAction", "QuickAction", "quickActions", false),
  suffix_type("remoteSite", "RemoteSiteSetting", "remoteSiteSettings", false),
  suffix_type("namedCredential", "NamedCredential", "namedCredentials", false),
  suffix_type("workflow", "Workflow", "workflows", false),
];

/// A child type stored under `objects/<Object>/<folder>/`.
#[derive(Debug, Clone, Copy)]
struct ChildType {
  folder: &'static str,
  suffix: &'static str,
  type_name: &'static str,
}

const CHILD_TYPES: &[ChildType] = &[
  ChildType {
    folder: "fields",
    suffix: "field",
    type_name: "CustomField",
  },
  ChildType {
    folder: "validationRules",
    suffix: "validationRule",
    type_name: "ValidationRule",
  },
  ChildType {
    folder: "recordTypes",
    suffix: "recordType",
    type_name: "RecordType",
  },
  ChildType {
    folder: "listViews",
    suffix: "listView",
    type_name: "ListView",
  },
  ChildType {
    folder: "compactLayouts",
    suffix: "compactLayout",
    type_name: "CompactLayout",
  },
  ChildType {
    folder: "webLinks",
    suffix: "webLink",
    type_name: "WebLink",
  },
  ChildType {
    folder: "fieldSets",
    suffix: "fieldSet",
    type_name: "FieldSet",
  },
  ChildType {
    folder: "businessProcesses",
    suffix: "businessProcess",
    type_name: "BusinessProcess",
  },
];

/// Directory bundles: every file under `<folder>/<name>/` belongs to one component.
const BUNDLE_TYPES: &[(&str, &str)] = &[
  ("lwc", "LightningComponentBundle"),
  ("aura", "AuraDefinitionBundle"),
  ("staticresources", "StaticResource"),
];

const META_SUFFIX: &str = "-meta.xml";

/// Where a file belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
  pub id: ComponentId,
  /// Directory containing the type folder, relative to the scanned directory.
  ///
  /// Component hashes are computed over paths relative to this root so a
  /// component hashes the same wherever its package directory sits.
  pub metadata_root: PathBuf,
  /// For `-meta.xml` files, the XML root element the file must declare.
  pub expected_root: Option<String>,
}

/// A `-meta.xml` file of a type the registry does not list.
///
/// The inventory reads the type from the file's XML root element; see
/// [`unregistered_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregistered {
  /// Component name, qualified by object for files under `objects/<Object>/`.
  pub name: String,
  /// File suffix without `-meta.xml`, e.g. `settings`.
  pub suffix: String,
  pub metadata_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
  Known(Classified),
  Unregistered(Unregistered),
}

/// Classify a file path relative to a package directory.
///
/// Returns `None` for files that are not metadata (READMEs, tooling config).
pub fn classify(rel: &Path) -> Option<Classification> {
  let parts: Vec<String> = rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect();
  let file_name = parts.last()?;
  let is_meta = file_name.ends_with(META_SUFFIX);

  if let Some(classified) = classify_bundle(&parts, is_meta) {
    return Some(Classification::Known(classified));
  }

  if let Some(classified) = classify_object_child(&parts) {
    return Some(Classification::Known(classified));
  }

  for entry in SUFFIX_TYPES {
    let Some(name) = strip_type_suffix(file_name, entry.suffix, entry.has_source) else {
      continue;
    };
    let folder_idx = parts[..parts.len() - 1].iter().rposition(|p| p == entry.folder);
    let metadata_root = match folder_idx {
      Some(idx) => join_parts(&parts[..idx]),
      None => join_parts(&parts[..parts.len() - 1]),
    };
    return Some(Classification::Known(Classified {
      id: ComponentId::new(entry.type_name, name),
      metadata_root,
      expected_root: is_meta.then(|| entry.type_name.to_string()),
    }));
  }

  if is_meta {
    return classify_unregistered(&parts).map(Classification::Unregistered);
  }

  None
}

/// Type of an unregistered component from its XML root element.
///
/// Settings files are the exception: `Account.settings-meta.xml` declares
/// `<AccountSettings>` but deploys as `Settings:Account`.
pub fn unregistered_type(root_element: &str, suffix: &str) -> String {
  if suffix == "settings" {
    return "Settings".to_string();
  }
  root_element.to_string()
}

/// Every type the registry classifies, deduplicated, in table order.
pub fn known_types() -> Vec<&'static str> {
  let mut types: Vec<&'static str> = Vec::new();
  let all = SUFFIX_TYPES
    .iter()
    .map(|t| t.type_name)
    .chain(CHILD_TYPES.iter().map(|t| t.type_name))
    .chain(BUNDLE_TYPES.iter().map(|(_, t)| *t));
  for type_name in all {
    if !types.contains(&type_name) {
      types.push(type_name);
    }
  }
  types
}

fn classify_bundle(parts: &[String], is_meta: bool) -> Option<Classified> {
  for (folder, type_name) in BUNDLE_TYPES {
    let Some(idx) = parts.iter().rposition(|p| p == folder) else {
      continue;
    };
    // Need `<folder>/<bundle>/<file...>`; files directly in the folder are
    // either tooling config (lwc/jsconfig.json) or single-file resources.
    if parts.len() < idx + 3 {
      continue;
    }
    return Some(Classified {
      id: ComponentId::new(*type_name, parts[idx + 1].clone()),
      metadata_root: join_parts(&parts[..idx]),
      expected_root: is_meta.then(|| type_name.to_string()),
    });
  }
  None
}

fn classify_object_child(parts: &[String]) -> Option<Classified> {
  // objects/<Object>/<childFolder>/<Name>.<suffix>-meta.xml
  let idx = parts.iter().rposition(|p| p == "objects")?;
  if parts.len() != idx + 4 {
    return None;
  }
  let object = &parts[idx + 1];
  let child_folder = &parts[idx + 2];
  let file_name = &parts[idx + 3];

  let child = CHILD_TYPES.iter().find(|c| c.folder == child_folder)?;
  let name = strip_type_suffix(file_name, child.suffix, false)?;

  Some(Classified {
    id: ComponentId::new(child.type_name, format!("{}.{}", object, name)),
    metadata_root: join_parts(&parts[..idx]),
    expected_root: Some(child.type_name.to_string()),
  })
}

fn classify_unregistered(parts: &[String]) -> Option<Unregistered> {
  let file_name = parts.last()?;
  let stem = file_name.strip_suffix(META_SUFFIX)?;
  let (name, suffix) = stem.rsplit_once('.')?;
  if name.is_empty() || suffix.is_empty() {
    return None;
  }

  // objects/<Object>/<childFolder>/<Name>.<suffix>-meta.xml
  if let Some(idx) = parts.iter().rposition(|p| p == "objects")
    && parts.len() == idx + 4
  {
    return Some(Unregistered {
      name: format!("{}.{}", parts[idx + 1], name),
      suffix: suffix.to_string(),
      metadata_root: join_parts(&parts[..idx]),
    });
  }

  // <typeFolder>/<Name>.<suffix>-meta.xml
  let metadata_root = if parts.len() >= 2 {
    join_parts(&parts[..parts.len() - 2])
  } else {
    PathBuf::new()
  };
  Some(Unregistered {
    name: name.to_string(),
    suffix: suffix.to_string(),
    metadata_root,
  })
}

/// Strip `.<suffix>-meta.xml` (or `.<suffix>` for source files) from a name.
fn strip_type_suffix<'a>(file_name: &'a str, suffix: &str, has_source: bool) -> Option<&'a str> {
  let meta = format!(".{}{}", suffix, META_SUFFIX);
  if let Some(name) = file_name.strip_suffix(meta.as_str()) {
    return (!name.is_empty()).then_some(name);
  }
  if has_source {
    let source = format!(".{}", suffix);
    if let Some(name) = file_name.strip_suffix(source.as_str()) {
      return (!name.is_empty()).then_some(name);
    }
  }
  None
}

fn join_parts(parts: &[String]) -> PathBuf {
  parts.iter().collect()
}
