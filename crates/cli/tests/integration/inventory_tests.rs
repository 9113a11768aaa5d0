use super::common::{TestEnv, stdout_of};

#[test]
fn test_inventory_lists_components() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");
  env.apex_class("Bar", "public class Bar {}");

  let stdout = stdout_of(env.sfd_cmd().arg("inventory"));

  assert!(stdout.contains("ApexClass:Bar"));
  assert!(stdout.contains("ApexClass:Foo"));
  assert!(stdout.contains("2 component(s)"));
}

#[test]
fn test_inventory_json() {
  let env = TestEnv::project();
  env.apex_class("Foo", "public class Foo {}");

  let stdout = stdout_of(env.sfd_cmd().args(["inventory", "-o", "json"]));
  let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();

  assert_eq!(items.as_array().unwrap().len(), 1);
  assert_eq!(items[0]["type"], "ApexClass");
  assert_eq!(items[0]["name"], "Foo");
  assert_eq!(items[0]["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_inventory_rejects_malformed_meta_xml() {
  let env = TestEnv::project();
  env.write_file(
    "project/force-app/main/default/classes/Broken.cls-meta.xml",
    "<ApexClass><status>",
  );
  env.write_file("project/force-app/main/default/classes/Broken.cls", "public class Broken {}");

  let output = env.sfd_cmd().arg("inventory").output().unwrap();

  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("Broken.cls-meta.xml"));
}
