use std::time::Duration;

use serde_json::json;
use sfdelta_lib::job::{DeployError, ValidationOutcome};
use sfdelta_lib::metadata::{ComponentId, scan_project};
use sfdelta_lib::org::Operation;
use sfdelta_lib::org::testing::ScriptedTransport;
use sfdelta_lib::workflow::{RunOutcome, Workflow, WorkflowError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::common::{TestEnv, accepting_org};

fn record_current_state(env: &TestEnv, org: &str) {
  let inventory = scan_project(env.root()).unwrap();
  env
    .config()
    .snapshot_store(org)
    .save_and_set_current(&inventory.snapshot)
    .unwrap();
}

#[tokio::test(start_paused = true)]
async fn modified_class_is_validated_then_deployed() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  env.apex_class("Bar", "public class Bar {}");
  record_current_state(&env, "uat");
  env.apex_class("Foo", "public class Foo { Integer x; }");

  let transport = accepting_org();
  let workflow = Workflow::new(env.config(), transport.clone()).unwrap();
  let report = workflow.run("uat", false, &CancellationToken::new()).await.unwrap();

  assert_eq!(report.outcome, RunOutcome::Deployed);
  let modified = &report.plan.change_set.modified;
  assert_eq!(modified.len(), 1);
  assert_ne!(modified[0].old.content_hash, modified[0].new.content_hash);
  assert_eq!(report.plan.package.manifest, vec![ComponentId::new("ApexClass", "Foo")]);

  let validation = report.validation.as_ref().unwrap();
  assert_eq!(validation.outcome, ValidationOutcome::Passed);
  let deploy = report.deploy.as_ref().unwrap();
  assert_eq!(deploy.job.package_hash, validation.job.package_hash);

  let submitted = &transport.calls_for(Operation::CheckDeploy)[0];
  assert_eq!(submitted.org_alias, "uat");
  assert_eq!(submitted.payload["package"]["manifest"], json!(["ApexClass:Foo"]));

  let current = env.config().snapshot_store("uat").load_current().unwrap().unwrap();
  let foo = current.get(&ComponentId::new("ApexClass", "Foo")).unwrap();
  assert_eq!(foo.content_hash, modified[0].new.content_hash);
}

#[tokio::test(start_paused = true)]
async fn package_changed_after_validation_is_not_deployed() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  let transport = accepting_org();
  let workflow = Workflow::new(env.config(), transport.clone()).unwrap();
  let cancel = CancellationToken::new();

  let plan = workflow.plan("uat", &cancel).await.unwrap();
  let validation = workflow.validate("uat", &plan, &cancel).await.unwrap();
  assert!(validation.passed());

  env.apex_class("Foo", "public class Foo { void changed() {} }");
  let replanned = workflow.plan("uat", &cancel).await.unwrap();
  assert_ne!(replanned.package.content_hash, plan.package.content_hash);

  let err = workflow
    .deploy("uat", &replanned, &validation.job, true, &cancel)
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    WorkflowError::Deploy(DeployError::StaleValidation { .. })
  ));
  assert!(transport.calls_for(Operation::QuickDeploy).is_empty());
  assert!(transport.calls_for(Operation::Deploy).is_empty());
  assert!(env.config().snapshot_store("uat").load_current().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn file_edited_during_validation_is_not_deployed() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  let transport = accepting_org();
  let workflow = Workflow::new(env.config(), transport.clone()).unwrap();
  let cancel = CancellationToken::new();

  let plan = workflow.plan("uat", &cancel).await.unwrap();
  let validation = workflow.validate("uat", &plan, &cancel).await.unwrap();
  assert!(validation.passed());

  env.apex_class("Foo", "public class Foo { void unvalidated() {} }");

  let err = workflow
    .deploy("uat", &plan, &validation.job, false, &cancel)
    .await
    .unwrap_err();

  match err {
    WorkflowError::Deploy(DeployError::StaleValidation { validated, current, .. }) => {
      assert_eq!(validated, plan.package.content_hash);
      assert_ne!(current, validated);
    }
    other => panic!("expected StaleValidation, got {:?}", other),
  }
  assert!(transport.calls_for(Operation::Deploy).is_empty());
  assert!(env.config().snapshot_store("uat").load_current().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn stuck_validation_times_out_without_deploying() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  let transport = Arc::new(
    ScriptedTransport::new()
      .on_ok(Operation::CheckDeploy, json!({"id": "0AfSTUCK"}))
      .on_ok(Operation::DeployStatus, json!({"status": "InProgress"})),
  );
  let workflow = Workflow::new(env.config(), transport.clone()).unwrap();

  let report = workflow.run("uat", false, &CancellationToken::new()).await.unwrap();

  assert_eq!(report.outcome, RunOutcome::TimedOut);
  let validation = report.validation.unwrap();
  assert_eq!(validation.outcome, ValidationOutcome::TimedOut);
  assert!(validation.elapsed >= Duration::from_secs(60));
  assert!(report.deploy.is_none());
  assert!(transport.calls_for(Operation::Deploy).is_empty());
}

#[tokio::test(start_paused = true)]
async fn package_follows_dependency_order() {
  let env = TestEnv::new();
  env.apex_class("AccountService", "public class AccountService {}");
  env.validation_rule("Account", "Require_Region");
  env.custom_field("Account", "Region__c", "Region");
  env.apex_class("Legacy", "public class Legacy {}");
  record_current_state(&env, "uat");

  env.remove_apex_class("Legacy");
  env.apex_class("AccountService", "public class AccountService { String region; }");
  env.custom_field("Account", "Region__c", "Sales Region");
  env.validation_rule("Account", "Require_Region");
  env.custom_field("Account", "Tier__c", "Tier");

  let workflow = Workflow::new(env.config(), accepting_org()).unwrap();
  let plan = workflow.plan("uat", &CancellationToken::new()).await.unwrap();

  assert_eq!(
    plan.package.manifest,
    vec![
      ComponentId::new("CustomField", "Account.Region__c"),
      ComponentId::new("CustomField", "Account.Tier__c"),
      ComponentId::new("ApexClass", "AccountService"),
    ]
  );
  assert_eq!(plan.package.destructive, vec![ComponentId::new("ApexClass", "Legacy")]);

  let xml = plan.package.package_xml("62.0");
  let field = xml.find("<name>CustomField</name>").unwrap();
  let class = xml.find("<name>ApexClass</name>").unwrap();
  assert!(field < class);
  assert!(plan.package.destructive_changes_xml("62.0").unwrap().contains("<members>Legacy</members>"));
}

#[tokio::test(start_paused = true)]
async fn failed_deploy_keeps_previous_reference() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  record_current_state(&env, "uat");
  let before = env.config().snapshot_store("uat").load_current().unwrap().unwrap();
  env.apex_class("Foo", "public class Foo { broken }");

  let transport = Arc::new(
    ScriptedTransport::new()
      .on_ok(Operation::CheckDeploy, json!({"id": "0AfVAL"}))
      .on_ok(Operation::Deploy, json!({"id": "0AfDEP"}))
      .on_ok(Operation::DeployStatus, json!({"status": "Succeeded"}))
      .on_ok(Operation::DeployStatus, json!({"status": "Failed"})),
  );
  let workflow = Workflow::new(env.config(), transport.clone()).unwrap();

  let report = workflow.run("uat", false, &CancellationToken::new()).await.unwrap();

  assert_eq!(report.outcome, RunOutcome::DeployFailed);
  assert_eq!(transport.calls_for(Operation::Deploy).len(), 1);
  let after = env.config().snapshot_store("uat").load_current().unwrap().unwrap();
  assert_eq!(after.id, before.id);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_is_aborted() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  let transport = Arc::new(
    ScriptedTransport::new()
      .on_ok(Operation::CheckDeploy, json!({"id": "0AfVAL"}))
      .on_ok(Operation::DeployStatus, json!({"status": "InProgress"})),
  );
  let workflow = Workflow::new(env.config(), transport).unwrap();
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_secs(5)).await;
    trigger.cancel();
  });

  let report = workflow.run("uat", false, &cancel).await.unwrap();

  assert_eq!(report.outcome, RunOutcome::Aborted);
  assert!(report.deploy.is_none());
}
