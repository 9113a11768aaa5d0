use super::common::{ACCEPTING_SF, TestEnv, stdout_of};

fn deploy(env: &TestEnv, org: &str) {
  let sf = env.fake_sf(ACCEPTING_SF);
  env
    .sfd_cmd()
    .env("SFDELTA_SF_BIN", &sf)
    .args(["deploy", "--target-org", org])
    .assert()
    .success();
}

#[test]
fn test_snapshot_list_empty() {
  let env = TestEnv::project();

  let stdout = stdout_of(env.sfd_cmd().args(["snapshot", "list", "--target-org", "uat"]));

  assert!(stdout.contains("No snapshots for uat"));
}

#[test]
fn test_snapshot_list_after_deploy() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  deploy(&env, "uat");

  let stdout = stdout_of(env.sfd_cmd().args(["snapshot", "list", "--target-org", "uat"]));

  assert!(stdout.contains("(current)"));
  assert!(stdout.contains("1 components"));
  assert!(env.snapshot_dir("uat").join("index.json").exists());
}

#[test]
fn test_snapshot_list_json_and_show() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  deploy(&env, "uat");

  let list: serde_json::Value = serde_json::from_str(&stdout_of(
    env.sfd_cmd().args(["snapshot", "list", "--target-org", "uat", "-o", "json"]),
  ))
  .unwrap();
  let id = list["current"].as_str().unwrap().to_string();
  assert_eq!(list["snapshots"][0]["is_current"], true);

  let stdout = stdout_of(env.sfd_cmd().args(["snapshot", "show", "--target-org", "uat", &id]));
  assert!(stdout.contains(&id));
  assert!(stdout.contains("ApexClass:Foo"));
}

#[test]
fn test_snapshot_show_unknown_id_fails() {
  let env = TestEnv::project();

  env
    .sfd_cmd()
    .args(["snapshot", "show", "--target-org", "uat", "0000000000-deadbeef"])
    .assert()
    .failure();
}

#[test]
fn test_snapshot_delete_never_removes_current() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  deploy(&env, "uat");

  let list: serde_json::Value = serde_json::from_str(&stdout_of(
    env.sfd_cmd().args(["snapshot", "list", "--target-org", "uat", "-o", "json"]),
  ))
  .unwrap();
  let id = list["current"].as_str().unwrap().to_string();

  let result: serde_json::Value = serde_json::from_str(&stdout_of(env.sfd_cmd().args([
    "snapshot",
    "delete",
    "--target-org",
    "uat",
    &id,
    "--force",
    "-o",
    "json",
  ])))
  .unwrap();

  assert_eq!(result["skipped_current"], id.as_str());
  assert_eq!(result["deleted"].as_array().unwrap().len(), 0);
  assert!(env.snapshot_dir("uat").join(format!("{}.json", id)).exists());
}

#[test]
fn test_snapshot_delete_older_than_dry_run() {
  let env = TestEnv::project();

  env
    .sfd_cmd()
    .args(["snapshot", "delete", "--target-org", "uat", "--older-than", "7d", "--dry-run"])
    .assert()
    .success();
}
