use super::common::{ACCEPTING_SF, TestEnv, stdout_of};

#[test]
fn test_package_prints_manifest_in_dependency_order() {
  let env = TestEnv::project();
  env.apex_class("AccountService", "public class AccountService {}");
  env.write_file(
    "project/force-app/main/default/objects/Account/fields/Region__c.field-meta.xml",
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomField xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    <fullName>Region__c</fullName>\n</CustomField>\n",
  );

  let stdout = stdout_of(env.sfd_cmd().args(["package", "--target-org", "uat"]));

  let field = stdout.find("CustomField:Account.Region__c").unwrap();
  let class = stdout.find("ApexClass:AccountService").unwrap();
  assert!(field < class);
}

#[test]
fn test_package_out_writes_deployable_directory() {
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
  env.apex_class("Foo", "public class Foo { void run() {} }");
  env.remove_apex_class("Old");

  let out = env.temp.path().join("out");
  env
    .sfd_cmd()
    .args(["package", "--target-org", "uat", "--out"])
    .arg(&out)
    .assert()
    .success();

  let package_xml = std::fs::read_to_string(out.join("package.xml")).unwrap();
  assert!(package_xml.contains("<members>Foo</members>"));
  assert!(!package_xml.contains("<members>Old</members>"));
  let destructive = std::fs::read_to_string(out.join("destructiveChanges.xml")).unwrap();
  assert!(destructive.contains("<members>Old</members>"));
  assert!(out.join("force-app/main/default/classes/Foo.cls").exists());
  assert!(out.join("force-app/main/default/classes/Foo.cls-meta.xml").exists());
}

#[test]
fn test_package_json_carries_content_hash() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");

  let first: serde_json::Value =
    serde_json::from_str(&stdout_of(env.sfd_cmd().args(["package", "--target-org", "uat", "-o", "json"]))).unwrap();
  let second: serde_json::Value =
    serde_json::from_str(&stdout_of(env.sfd_cmd().args(["package", "--target-org", "uat", "-o", "json"]))).unwrap();

  assert_eq!(first["manifest"], serde_json::json!(["ApexClass:Foo"]));
  assert_eq!(first["contentHash"], second["contentHash"]);
}

#[test]
fn test_empty_package() {
  let env = TestEnv::project();

  let stdout = stdout_of(env.sfd_cmd().args(["package", "--target-org", "uat"]));

  assert!(stdout.contains("Nothing to deploy."));
}
