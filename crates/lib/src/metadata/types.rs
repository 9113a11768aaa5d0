//! Metadata component identity and value types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::util::hash::ContentHash;

/// Identity of a metadata component: its type plus API name.
///
/// Ordered by type, then name. Displayed and serialized as `Type:ApiName`,
/// e.g. `ApexClass:Foo` or `CustomField:Account.Industry__c`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId {
  pub type_name: String,
  pub api_name: String,
}

impl ComponentId {
  pub fn new(type_name: impl Into<String>, api_name: impl Into<String>) -> Self {
    Self {
      type_name: type_name.into(),
      api_name: api_name.into(),
    }
  }
}

impl fmt::Display for ComponentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.type_name, self.api_name)
  }
}

/// Error parsing a `Type:ApiName` identity string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid component identity '{0}': expected Type:ApiName")]
pub struct ParseComponentIdError(pub String);

impl FromStr for ComponentId {
  type Err = ParseComponentIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once(':') {
      Some((type_name, api_name)) if !type_name.is_empty() && !api_name.is_empty() => {
        Ok(ComponentId::new(type_name, api_name))
      }
      _ => Err(ParseComponentIdError(s.to_string())),
    }
  }
}

impl Serialize for ComponentId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ComponentId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

/// A single metadata component as seen at scan or fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataComponent {
  #[serde(rename = "type")]
  pub type_name: String,
  pub api_name: String,
  pub content_hash: ContentHash,
  /// Newest modification time of the component's files, Unix seconds.
  pub last_modified: u64,
}

impl MetadataComponent {
  pub fn id(&self) -> ComponentId {
    ComponentId::new(&self.type_name, &self.api_name)
  }
}
