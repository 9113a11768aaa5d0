use predicates::prelude::*;

use super::common::{ACCEPTING_SF, FAILING_SF, TestEnv, stdout_of};

#[test]
fn test_deploy_records_snapshot() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  let sf = env.fake_sf(ACCEPTING_SF);

  env
    .sfd_cmd()
    .env("SFDELTA_SF_BIN", &sf)
    .args(["deploy", "--target-org", "uat"])
    .assert()
    .success()
    .stdout(predicate::str::contains("validation passed"))
    .stdout(predicate::str::contains("deploy succeeded"))
    .stdout(predicate::str::contains("Recorded snapshot"));

  assert!(env.snapshot_dir("uat").join("index.json").exists());
}

#[test]
fn test_second_deploy_has_nothing_to_do() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  let sf = env.fake_sf(ACCEPTING_SF);
  env
    .sfd_cmd()
    .env("SFDELTA_SF_BIN", &sf)
    .args(["deploy", "--target-org", "uat"])
    .assert()
    .success();

  let stdout = stdout_of(
    env
      .sfd_cmd()
      .env("SFDELTA_SF_BIN", "sh -c false")
      .args(["deploy", "--target-org", "uat"]),
  );
  assert!(stdout.contains("No changes."));
}

#[test]
fn test_quick_deploy_json_report() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  let sf = env.fake_sf(ACCEPTING_SF);

  let stdout = stdout_of(
    env
      .sfd_cmd()
      .env("SFDELTA_SF_BIN", &sf)
      .args(["deploy", "--target-org", "uat", "--quick", "-o", "json"]),
  );
  let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();

  assert_eq!(report["outcome"], "deployed");
  assert_eq!(report["deploy"]["quick"], true);
  assert_eq!(report["validation"]["outcome"], "passed");
}

#[test]
fn test_failed_validation_exits_non_zero_and_keeps_history() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {");
  let sf = env.fake_sf(FAILING_SF);

  env
    .sfd_cmd()
    .env("SFDELTA_SF_BIN", &sf)
    .args(["deploy", "--target-org", "uat"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Unexpected token"))
    .stderr(predicate::str::contains("validation failed"));

  assert!(!env.snapshot_dir("uat").join("index.json").exists());
}

#[test]
fn test_validate_several_orgs() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  let sf = env.fake_sf(ACCEPTING_SF);

  let stdout = stdout_of(env.sfd_cmd().env("SFDELTA_SF_BIN", &sf).args([
    "validate",
    "--target-org",
    "uat",
    "--target-org",
    "qa",
    "-o",
    "json",
  ]));
  let results: serde_json::Value = serde_json::from_str(&stdout).unwrap();

  assert_eq!(results[0]["org"], "qa");
  assert_eq!(results[1]["org"], "uat");
  assert_eq!(results[0]["report"]["outcome"], "passed");
  assert!(!env.snapshot_dir("uat").exists());
}

#[test]
fn test_validate_unreachable_sf_fails() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");

  env
    .sfd_cmd()
    .args(["validate", "--target-org", "uat"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Validation did not pass for: uat"));
}
