//! Shared helpers for library integration tests.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use sfdelta_lib::config::WorkflowConfig;
use sfdelta_lib::org::Operation;
use sfdelta_lib::org::testing::ScriptedTransport;
use tempfile::TempDir;

const CLASSES: &str = "force-app/main/default/classes";
const OBJECTS: &str = "force-app/main/default/objects";

/// A project directory and a separate snapshot history directory.
pub struct TestEnv {
  pub project: TempDir,
  pub data: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let env = Self {
      project: TempDir::new().unwrap(),
      data: TempDir::new().unwrap(),
    };
    env.write(
      "sfdx-project.json",
      r#"{"packageDirectories": [{"path": "force-app", "default": true}]}"#,
    );
    env
  }

  pub fn root(&self) -> &Path {
    self.project.path()
  }

  pub fn write(&self, rel: &str, content: &str) {
    let path = self.project.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
  }

  pub fn remove(&self, rel: &str) {
    std::fs::remove_file(self.project.path().join(rel)).unwrap();
  }

  pub fn apex_class(&self, name: &str, body: &str) {
    self.write(&format!("{}/{}.cls", CLASSES, name), body);
    self.write(
      &format!("{}/{}.cls-meta.xml", CLASSES, name),
      "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ApexClass xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <apiVersion>62.0</apiVersion>\n    <status>Active</status>\n</ApexClass>\n",
    );
  }

  pub fn remove_apex_class(&self, name: &str) {
    self.remove(&format!("{}/{}.cls", CLASSES, name));
    self.remove(&format!("{}/{}.cls-meta.xml", CLASSES, name));
  }

  pub fn custom_field(&self, object: &str, field: &str, label: &str) {
    self.write(
      &format!("{}/{}/fields/{}.field-meta.xml", OBJECTS, object, field),
      &format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomField xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <fullName>{}</fullName>\n    <label>{}</label>\n</CustomField>\n",
        field, label
      ),
    );
  }

  pub fn validation_rule(&self, object: &str, rule: &str) {
    self.write(
      &format!("{}/{}/validationRules/{}.validationRule-meta.xml", OBJECTS, object, rule),
      &format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ValidationRule xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <fullName>{}</fullName>\n    <active>true</active>\n</ValidationRule>\n",
        rule
      ),
    );
  }

  /// Config with fast polling and history kept in this environment.
  pub fn config(&self) -> WorkflowConfig {
    WorkflowConfig {
      snapshot_dir: Some(self.data.path().to_path_buf()),
      poll_interval_secs: 2,
      poll_timeout_secs: 60,
      ..WorkflowConfig::for_project(self.root())
    }
  }
}

/// An org that accepts every validation and deploy.
pub fn accepting_org() -> Arc<ScriptedTransport> {
  Arc::new(
    ScriptedTransport::new()
      .on_ok(Operation::CheckDeploy, json!({"id": "0AfVAL000000001"}))
      .on_ok(Operation::Deploy, json!({"id": "0AfDEP000000001"}))
      .on_ok(Operation::QuickDeploy, json!({"id": "0AfQCK000000001"}))
      .on_ok(Operation::DeployStatus, json!({"status": "InProgress"}))
      .on_ok(Operation::DeployStatus, json!({"status": "Succeeded"})),
  )
}
