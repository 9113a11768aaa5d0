//! Test utilities for sfdelta-lib.
//!
//! Builds throwaway Salesforce DX projects on disk.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::consts::{DEFAULT_API_VERSION, SFDX_PROJECT_FILENAME};

const DEFAULT_DIR: &str = "force-app/main/default";

/// A temporary project with `force-app` as its only package directory.
pub struct SampleProject {
  dir: TempDir,
}

impl SampleProject {
  pub fn new() -> Self {
    let project = Self::without_descriptor();
    project.write(
      SFDX_PROJECT_FILENAME,
      &format!(
        r#"{{"packageDirectories": [{{"path": "force-app", "default": true}}], "sourceApiVersion": "{}"}}"#,
        DEFAULT_API_VERSION
      ),
    );
    project
  }

  /// An empty temporary directory with no `sfdx-project.json`.
  pub fn without_descriptor() -> Self {
    Self {
      dir: TempDir::new().unwrap(),
    }
  }

  pub fn root(&self) -> &Path {
    self.dir.path()
  }

  /// Write a file relative to the project root, creating parents.
  pub fn write(&self, rel: &str, content: &str) {
    let path = self.dir.path().join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  pub fn remove(&self, rel: &str) {
    fs::remove_file(self.dir.path().join(rel)).unwrap();
  }

  pub fn apex_class(&self, name: &str, body: &str) {
    self.write(&format!("{}/classes/{}.cls", DEFAULT_DIR, name), body);
    self.write(&format!("{}/classes/{}.cls-meta.xml", DEFAULT_DIR, name), &apex_class_meta());
  }

  pub fn custom_field(&self, object: &str, field: &str) {
    self.write(
      &format!("{}/objects/{}/fields/{}.field-meta.xml", DEFAULT_DIR, object, field),
      &format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomField xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <fullName>{}</fullName>\n    <type>Text</type>\n    <length>80</length>\n</CustomField>\n",
        field
      ),
    );
  }

  pub fn validation_rule(&self, object: &str, rule: &str) {
    self.write(
      &format!(
        "{}/objects/{}/validationRules/{}.validationRule-meta.xml",
        DEFAULT_DIR, object, rule
      ),
      &format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ValidationRule xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <fullName>{}</fullName>\n    <active>true</active>\n</ValidationRule>\n",
        rule
      ),
    );
  }

  pub fn lwc(&self, name: &str) {
    self.write(
      &format!("{}/lwc/{}/{}.js", DEFAULT_DIR, name, name),
      "import { LightningElement } from 'lwc';\nexport default class extends LightningElement {}\n",
    );
    self.write(
      &format!("{}/lwc/{}/{}.html", DEFAULT_DIR, name, name),
      "<template></template>\n",
    );
    self.write(
      &format!("{}/lwc/{}/{}.js-meta.xml", DEFAULT_DIR, name, name),
      &format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<LightningComponentBundle xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <apiVersion>{}</apiVersion>\n    <isExposed>false</isExposed>\n</LightningComponentBundle>\n",
        DEFAULT_API_VERSION
      ),
    );
  }
}

pub fn apex_class_meta() -> String {
  format!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ApexClass xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <apiVersion>{}</apiVersion>\n    <status>Active</status>\n</ApexClass>\n",
    DEFAULT_API_VERSION
  )
}
