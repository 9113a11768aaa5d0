//! Metadata type dependency order.
//!
//! The order is data: an ordered chain of type names plus optional explicit
//! prerequisite edges, validated once as a DAG. Each known type gets a rank;
//! prerequisites always rank below their dependents.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::debug;

/// Built-in chain: each type is a prerequisite of the next.
pub const DEFAULT_CHAIN: &[&str] = &[
  "CustomObject",
  "CustomField",
  "ValidationRule",
  "Flow",
  "ApexClass",
  "ApexTrigger",
];

/// Built-in explicit edges, `(type, prerequisites)`.
pub const DEFAULT_PREREQUISITES: &[(&str, &[&str])] = &[
  ("CustomField", &["GlobalValueSet"]),
  ("BusinessProcess", &["CustomField"]),
  ("RecordType", &["CustomField", "BusinessProcess"]),
  ("FieldSet", &["CustomField"]),
  ("CompactLayout", &["CustomField"]),
  ("ListView", &["CustomField"]),
  ("WebLink", &["CustomObject"]),
  ("ValidationRule", &["RecordType"]),
  ("CustomMetadata", &["CustomField"]),
  ("Workflow", &["CustomField"]),
  ("ApexClass", &["CustomLabels", "CustomMetadata", "NamedCredential", "RemoteSiteSetting"]),
  ("ApexComponent", &["ApexClass"]),
  ("ApexPage", &["ApexClass", "ApexComponent", "StaticResource"]),
  ("AuraDefinitionBundle", &["ApexClass", "StaticResource"]),
  ("LightningComponentBundle", &["ApexClass", "StaticResource"]),
  ("QuickAction", &["CustomField", "LightningComponentBundle"]),
  ("Layout", &["CustomField", "RecordType", "QuickAction", "WebLink"]),
  ("FlexiPage", &["LightningComponentBundle", "QuickAction"]),
  ("CustomTab", &["CustomObject", "FlexiPage", "ApexPage"]),
  ("CustomApplication", &["CustomTab"]),
  ("PermissionSet", &["ApexClass", "ApexPage", "CustomApplication", "CustomPermission", "CustomTab"]),
  ("PermissionSetGroup", &["PermissionSet"]),
  ("Profile", &["PermissionSet", "Layout"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
  #[error("dependency order has a cycle through: {}", .types.join(" -> "))]
  CyclicDependency { types: Vec<String> },
}

/// Validated partial order over metadata types.
///
/// Immutable after construction; share it with `Arc`.
#[derive(Debug, Clone)]
pub struct DependencyTable {
  ranks: HashMap<String, usize>,
  order: Vec<String>,
}

impl DependencyTable {
  /// Build and validate a table.
  ///
  /// `chain` entries are declared in order and each consecutive pair forms a
  /// prerequisite edge. `prerequisites` maps a type to the types it needs.
  ///
  /// # Errors
  ///
  /// Returns `CyclicDependency` naming the types on a cycle.
  pub fn new(chain: &[String], prerequisites: &BTreeMap<String, Vec<String>>) -> Result<Self, OrderError> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    let mut node = |graph: &mut DiGraph<String, ()>, name: &str| -> NodeIndex {
      *nodes
        .entry(name.to_string())
        .or_insert_with(|| graph.add_node(name.to_string()))
    };

    for pair in chain.windows(2) {
      let prerequisite = node(&mut graph, pair[0].as_str());
      let dependent = node(&mut graph, pair[1].as_str());
      graph.update_edge(prerequisite, dependent, ());
    }
    if let [only] = chain {
      node(&mut graph, only.as_str());
    }

    for (dependent, needs) in prerequisites {
      let dependent_idx = node(&mut graph, dependent.as_str());
      for prerequisite in needs {
        let prerequisite_idx = node(&mut graph, prerequisite.as_str());
        graph.update_edge(prerequisite_idx, dependent_idx, ());
      }
    }

    if toposort(&graph, None).is_err() {
      return Err(OrderError::CyclicDependency {
        types: cycle_members(&graph),
      });
    }

    let order = linearize(&graph);
    let ranks = order.iter().enumerate().map(|(rank, t)| (t.clone(), rank)).collect();
    debug!(types = order.len(), "dependency order validated");

    Ok(Self { ranks, order })
  }

  /// The built-in Salesforce order.
  pub fn salesforce() -> Result<Self, OrderError> {
    Self::new(&default_chain(), &default_prerequisites())
  }

  /// Rank of a type; unknown types rank after every known type.
  pub fn rank(&self, type_name: &str) -> usize {
    self.ranks.get(type_name).copied().unwrap_or(usize::MAX)
  }

  pub fn is_known(&self, type_name: &str) -> bool {
    self.ranks.contains_key(type_name)
  }

  /// Known types, prerequisites first.
  pub fn types(&self) -> &[String] {
    &self.order
  }
}

pub fn default_chain() -> Vec<String> {
  DEFAULT_CHAIN.iter().map(|t| t.to_string()).collect()
}

pub fn default_prerequisites() -> BTreeMap<String, Vec<String>> {
  DEFAULT_PREREQUISITES
    .iter()
    .map(|(t, needs)| (t.to_string(), needs.iter().map(|n| n.to_string()).collect()))
    .collect()
}

/// Kahn's algorithm; ties go to the earliest declared node, then by name.
fn linearize(graph: &DiGraph<String, ()>) -> Vec<String> {
  let mut in_degree: HashMap<NodeIndex, usize> = graph
    .node_indices()
    .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
    .collect();

  let mut ready: BinaryHeap<Reverse<(usize, &str, NodeIndex)>> = in_degree
    .iter()
    .filter(|(_, degree)| **degree == 0)
    .map(|(&idx, _)| Reverse((idx.index(), graph[idx].as_str(), idx)))
    .collect();

  let mut order = Vec::with_capacity(graph.node_count());
  while let Some(Reverse((_, name, idx))) = ready.pop() {
    order.push(name.to_string());
    for next in graph.neighbors_directed(idx, Direction::Outgoing) {
      if let Some(degree) = in_degree.get_mut(&next) {
        *degree -= 1;
        if *degree == 0 {
          ready.push(Reverse((next.index(), graph[next].as_str(), next)));
        }
      }
    }
  }
  order
}

fn cycle_members(graph: &DiGraph<String, ()>) -> Vec<String> {
  let mut members: Vec<String> = tarjan_scc(graph)
    .into_iter()
    .filter(|scc| scc.len() > 1 || scc.iter().any(|&idx| graph.contains_edge(idx, idx)))
    .flatten()
    .map(|idx| graph[idx].clone())
    .collect();
  members.sort();
  members
}
