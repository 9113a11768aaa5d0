use serde_json::json;
use sfdelta_lib::config::ReferenceSource;
use sfdelta_lib::metadata::{ComponentId, scan_project};
use sfdelta_lib::org::testing::ScriptedTransport;
use sfdelta_lib::org::{FailureKind, FetchError, Operation};
use sfdelta_lib::workflow::{Workflow, WorkflowError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::common::{TestEnv, accepting_org};

#[tokio::test]
async fn no_history_means_everything_is_added() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  env.custom_field("Account", "Region__c", "Region");
  let workflow = Workflow::new(env.config(), accepting_org()).unwrap();

  let plan = workflow.plan("fresh", &CancellationToken::new()).await.unwrap();

  assert_eq!(plan.change_set.added.len(), 2);
  assert!(plan.change_set.deleted.is_empty());
  assert_eq!(plan.reference_source, ReferenceSource::PreviousDeploy);
}

#[tokio::test(start_paused = true)]
async fn org_current_fetch_retries_transient_failures() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  let local = scan_project(env.root()).unwrap();
  let foo_hash = local.snapshot.get(&ComponentId::new("ApexClass", "Foo")).unwrap().content_hash.0.clone();

  let transport = Arc::new(
    ScriptedTransport::new()
      .on_failure(
        Operation::RetrieveManifest,
        FailureKind::Transient,
        "ECONNRESET",
        "socket hang up",
      )
      .on_ok(
        Operation::RetrieveManifest,
        json!({"components": [{"type": "ApexClass", "fullName": "Foo", "contentHash": foo_hash}]}),
      ),
  );
  let mut config = env.config();
  config.reference_source = ReferenceSource::OrgCurrent;
  let workflow = Workflow::new(config, transport.clone()).unwrap();

  let plan = workflow.plan("uat", &CancellationToken::new()).await.unwrap();

  assert!(plan.change_set.is_empty());
  assert!(plan.package.is_empty());
  assert_eq!(transport.calls_for(Operation::RetrieveManifest).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unreachable_org_fails_after_all_attempts() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  let transport = Arc::new(ScriptedTransport::new().on_failure(
    Operation::RetrieveManifest,
    FailureKind::Transient,
    "ETIMEDOUT",
    "connect timed out",
  ));
  let mut config = env.config();
  config.reference_source = ReferenceSource::OrgCurrent;
  config.fetch_max_attempts = 3;
  let workflow = Workflow::new(config, transport.clone()).unwrap();

  let err = workflow.plan("uat", &CancellationToken::new()).await.unwrap_err();

  match err {
    WorkflowError::Fetch(FetchError::OrgUnavailable { alias, attempts, .. }) => {
      assert_eq!(alias, "uat");
      assert_eq!(attempts, 3);
    }
    other => panic!("expected OrgUnavailable, got {:?}", other),
  }
  assert_eq!(transport.calls_for(Operation::RetrieveManifest).len(), 3);
}

#[tokio::test]
async fn rejected_fetch_is_not_retried() {
  let env = TestEnv::new();
  let transport = Arc::new(ScriptedTransport::new().on_failure(
    Operation::RetrieveManifest,
    FailureKind::Rejected,
    "NoOrgFound",
    "No authorization information found for bogus",
  ));
  let mut config = env.config();
  config.reference_source = ReferenceSource::OrgCurrent;
  let workflow = Workflow::new(config, transport.clone()).unwrap();

  assert!(workflow.plan("bogus", &CancellationToken::new()).await.is_err());
  assert_eq!(transport.calls_for(Operation::RetrieveManifest).len(), 1);
}
