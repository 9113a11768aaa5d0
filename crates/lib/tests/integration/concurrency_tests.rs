use std::sync::Arc;

use sfdelta_lib::config::WorkflowConfig;
use sfdelta_lib::metadata::ComponentId;
use sfdelta_lib::workflow::{RunOutcome, Workflow};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::common::{TestEnv, accepting_org};

#[tokio::test(start_paused = true)]
async fn orgs_deploy_concurrently_with_independent_history() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  env.custom_field("Account", "Region__c", "Region");

  let config = env.config();
  let table = Arc::new(config.validate().unwrap());
  let cancel = CancellationToken::new();
  let mut tasks = JoinSet::new();
  for org in ["uat", "qa", "staging"] {
    let workflow = Workflow::with_table(config.clone(), table.clone(), accepting_org());
    let cancel = cancel.clone();
    tasks.spawn(async move { (org, workflow.run(org, false, &cancel).await) });
  }

  let mut finished = Vec::new();
  while let Some(joined) = tasks.join_next().await {
    let (org, result) = joined.unwrap();
    assert_eq!(result.unwrap().outcome, RunOutcome::Deployed, "org {}", org);
    finished.push(org);
  }
  finished.sort();
  assert_eq!(finished, vec!["qa", "staging", "uat"]);

  for org in ["uat", "qa", "staging"] {
    let current = config.snapshot_store(org).load_current().unwrap().unwrap();
    assert!(current.get(&ComponentId::new("ApexClass", "Foo")).is_some());
  }
}

#[tokio::test(start_paused = true)]
async fn deploying_one_org_leaves_others_untouched() {
  let env = TestEnv::new();
  env.apex_class("Foo", "public class Foo {}");
  let config: WorkflowConfig = env.config();
  let workflow = Workflow::new(config.clone(), accepting_org()).unwrap();

  workflow.run("uat", false, &CancellationToken::new()).await.unwrap();
  let qa_plan = workflow.plan("qa", &CancellationToken::new()).await.unwrap();
  let uat_plan = workflow.plan("uat", &CancellationToken::new()).await.unwrap();

  assert!(uat_plan.package.is_empty());
  assert_eq!(qa_plan.package.manifest, vec![ComponentId::new("ApexClass", "Foo")]);
}
