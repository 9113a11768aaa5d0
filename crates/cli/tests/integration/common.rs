//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

const CLASSES: &str = "force-app/main/default/classes";

/// Stand-in for `sf`: accepts every deploy and reports it as succeeded.
pub const ACCEPTING_SF: &str = r#"#!/bin/sh
case "$3" in
  validate|start|quick)
    echo '{"status": 0, "result": {"id": "0AfFAKE0000001"}}'
    ;;
  report)
    echo '{"status": 0, "result": {"status": "Succeeded", "details": {}}}'
    ;;
  *)
    echo '{"status": 1, "name": "UnsupportedCommand", "message": "unsupported"}'
    exit 1
    ;;
esac
"#;

/// Stand-in for `sf` whose validations fail on a compile error.
pub const FAILING_SF: &str = r#"#!/bin/sh
case "$3" in
  validate|start|quick)
    echo '{"status": 0, "result": {"id": "0AfFAIL0000001"}}'
    ;;
  report)
    echo '{"status": 1, "result": {"status": "Failed", "details": {"componentFailures": {"componentType": "ApexClass", "fullName": "Foo", "problem": "Unexpected token", "problemType": "Error"}}}}'
    exit 1
    ;;
esac
"#;

/// Isolated test environment.
///
/// Each test gets its own project directory and its own data directory for
/// deployed snapshot history.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// An sfdx project with fast polling configured.
  pub fn project() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.write_file(
      "project/sfdx-project.json",
      r#"{"packageDirectories": [{"path": "force-app", "default": true}]}"#,
    );
    env.write_file(
      "project/sfdelta.toml",
      "poll_interval_secs = 1\npoll_timeout_secs = 30\n",
    );
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn project_path(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path().join("project")).unwrap()
  }

  /// Data path for deployed snapshots.
  pub fn data_path(&self) -> PathBuf {
    let p = self.temp.path().join("data");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn apex_class(&self, name: &str, body: &str) {
    self.write_file(&format!("project/{}/{}.cls", CLASSES, name), body);
    self.write_file(
      &format!("project/{}/{}.cls-meta.xml", CLASSES, name),
      "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ApexClass xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <apiVersion>62.0</apiVersion>\n    <status>Active</status>\n</ApexClass>\n",
    );
  }

  pub fn remove_apex_class(&self, name: &str) {
    let dir = self.temp.path().join("project").join(CLASSES);
    std::fs::remove_file(dir.join(format!("{}.cls", name))).unwrap();
    std::fs::remove_file(dir.join(format!("{}.cls-meta.xml", name))).unwrap();
  }

  /// Install a fake `sf` script and return the command that runs it.
  pub fn fake_sf(&self, script: &str) -> String {
    self.write_file("bin/sf.sh", script);
    format!("sh {}", self.temp.path().join("bin/sf.sh").display())
  }

  /// Get a pre-configured Command for the sfd binary.
  ///
  /// Points `--project` at the test project and isolates snapshot history
  /// through `SFDELTA_DATA_DIR`. `SFDELTA_SF_BIN` is cleared so no test
  /// reaches a real org by accident.
  pub fn sfd_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("sfd");
    cmd.arg("--project").arg(self.project_path());
    cmd.env("SFDELTA_DATA_DIR", self.data_path());
    cmd.env("SFDELTA_SF_BIN", "sh -c false");
    cmd
  }

  pub fn snapshot_dir(&self, org: &str) -> PathBuf {
    self.data_path().join("snapshots").join(org)
  }
}

pub fn stdout_of(cmd: &mut Command) -> String {
  let output = cmd.output().unwrap();
  assert!(
    output.status.success(),
    "command failed: {}",
    String::from_utf8_lossy(&output.stderr)
  );
  String::from_utf8(output.stdout).unwrap()
}
