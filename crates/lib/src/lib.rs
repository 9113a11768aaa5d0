//! sfdelta-lib: delta deploys of Salesforce metadata
//!
//! This crate provides the pieces of a validate-then-deploy pipeline:
//! - `metadata`: component identities and the local project inventory
//! - `snapshot`: point-in-time metadata state, diffing and deployed history
//! - `order`: type-level dependency ordering
//! - `package`: deterministic deploy packages built from a change set
//! - `org`: the boundary to a target org and the manifest fetcher
//! - `job`: check-only validation and deploy jobs with status polling
//! - `workflow`: the end-to-end pipeline for one org

pub mod config;
pub mod consts;
pub mod job;
pub mod metadata;
pub mod order;
pub mod org;
pub mod package;
pub mod platform;
pub mod snapshot;
pub mod util;
pub mod workflow;
