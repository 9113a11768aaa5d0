use super::common::{ACCEPTING_SF, TestEnv, stdout_of};

#[test]
fn test_diff_without_history_adds_everything() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");

  let stdout = stdout_of(env.sfd_cmd().args(["diff", "--target-org", "uat"]));

  assert!(stdout.contains("+ ApexClass:Foo"));
  assert!(stdout.contains("1 added, 0 modified, 0 deleted"));
}

#[test]
fn test_diff_after_deploy_shows_modifications_and_deletions() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  env.apex_class("Old", "public class Old {}");
  let sf = env.fake_sf(ACCEPTING_SF);
  env
    .sfd_cmd()
    .env("SFDELTA_SF_BIN", &sf)
    .args(["deploy", "--target-org", "uat"])
    .assert()
    .success();

  env.apex_class("Foo", "public class Foo { Integer count; }");
  env.remove_apex_class("Old");
  let stdout = stdout_of(env.sfd_cmd().args(["diff", "--target-org", "uat", "-o", "json"]));
  let diff: serde_json::Value = serde_json::from_str(&stdout).unwrap();

  assert_eq!(diff["referenceSource"], "previous-deploy");
  assert_eq!(diff["changeSet"]["added"].as_array().unwrap().len(), 0);
  assert_eq!(diff["changeSet"]["modified"].as_array().unwrap().len(), 1);
  assert_eq!(diff["changeSet"]["deleted"][0], "ApexClass:Old");
}

#[test]
fn test_diff_is_per_org() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  let sf = env.fake_sf(ACCEPTING_SF);
  env
    .sfd_cmd()
    .env("SFDELTA_SF_BIN", &sf)
    .args(["deploy", "--target-org", "uat"])
    .assert()
    .success();

  let uat = stdout_of(env.sfd_cmd().args(["diff", "--target-org", "uat"]));
  let qa = stdout_of(env.sfd_cmd().args(["diff", "--target-org", "qa"]));

  assert!(uat.contains("No changes."));
  assert!(qa.contains("+ ApexClass:Foo"));
}
