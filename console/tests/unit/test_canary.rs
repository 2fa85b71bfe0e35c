//! Canary rollout tests

use std::sync::Arc;

use openapi_client::models::CanaryResponse;
use serde_json::json;

use runme_console::canary::coordinator::CanaryRolloutCoordinator;
use runme_console::exec::api::ExecutionApi;
use runme_console::exec::fsm::RunState;
use runme_console::exec::registry::RunningTasks;
use runme_console::models::{CanaryStatus, ExecutionStatus, TaskKind, TaskRef};
use runme_console::notify::{self, NotificationKind, NotificationQueue};

use crate::fakes::FakeApi;

fn coordinator(
    api: Arc<FakeApi>,
) -> (CanaryRolloutCoordinator, Arc<RunningTasks>, Arc<NotificationQueue>) {
    let registry = Arc::new(RunningTasks::new());
    let notifications = Arc::new(NotificationQueue::new(notify::Options::default()));
    let api: Arc<dyn ExecutionApi> = api;
    let coordinator = CanaryRolloutCoordinator::new(api, registry.clone(), notifications.clone());
    (coordinator, registry, notifications)
}

fn response(status: &str, remaining: Vec<serde_json::Value>) -> CanaryResponse {
    serde_json::from_value(json!({
        "session_name": "site_experimental_1700000000",
        "experimental_host": "10.0.0.1",
        "status": status,
        "output": "ok: [10.0.0.1]",
        "remaining_hosts": remaining,
    }))
    .unwrap()
}

fn playbook() -> TaskRef {
    TaskRef::new(TaskKind::Playbook, 4)
}

#[tokio::test]
async fn test_continue_uses_snapshot_not_current_group() {
    // Group was [A, B, C] at trigger time; A ran the canary
    let snapshot = vec![json!({"id": 2, "ip": "10.0.0.2"}), json!({"id": 3, "ip": "10.0.0.3"})];
    let api = Arc::new(
        FakeApi::default().with_canary(response("experimental_success", snapshot.clone())),
    );
    let (coordinator, registry, _) = coordinator(api.clone());

    coordinator.trigger_canary(&playbook()).await.unwrap().unwrap();
    assert!(coordinator.offers_continuation(&playbook()));
    assert_eq!(registry.state(&playbook()), RunState::Success);

    // The group has since changed to [A, D]; the canary answer is reused as-is
    *api.canary.lock().unwrap() = Some(response(
        "experimental_success",
        vec![json!({"id": 4, "ip": "10.0.0.4"})],
    ));
    coordinator.continue_rollout(&playbook()).await.unwrap();

    let requests = api.continue_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].session_name, "site_experimental_1700000000");
    assert_eq!(requests[0].remaining_hosts, snapshot);
    assert_eq!(api.canaries(), 1);

    assert!(coordinator.pending(&playbook()).is_none());
    assert!(!registry.is_running(&playbook()));
}

#[tokio::test]
async fn test_single_host_group_offers_nothing() {
    let api = Arc::new(FakeApi::default().with_canary(response("experimental_success", vec![])));
    let (coordinator, _, _) = coordinator(api.clone());

    let result = coordinator.trigger_canary(&playbook()).await.unwrap().unwrap();

    assert_eq!(result.status, CanaryStatus::ExperimentalSuccess);
    assert!(!coordinator.offers_continuation(&playbook()));
    assert!(coordinator.continue_rollout(&playbook()).await.unwrap_err().is_validation());
    assert!(api.continue_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_canary_blocks_continuation() {
    let api = Arc::new(
        FakeApi::default().with_canary(response("experimental_failure", vec![json!("10.0.0.2")])),
    );
    let (coordinator, registry, notifications) = coordinator(api.clone());

    let result = coordinator.trigger_canary(&playbook()).await.unwrap().unwrap();

    assert!(!result.offers_continuation());
    assert_eq!(registry.last_known(&playbook()), Some(ExecutionStatus::Failed));
    assert_eq!(notifications.drain().pop().unwrap().kind, NotificationKind::Error);

    assert!(coordinator.continue_rollout(&playbook()).await.is_err());
    assert!(api.continue_requests.lock().unwrap().is_empty());

    // Closing the result is idempotent
    assert!(coordinator.dismiss(&playbook()));
    assert!(!coordinator.dismiss(&playbook()));
}

#[tokio::test]
async fn test_failed_continuation_still_closes_result() {
    let api = Arc::new(
        FakeApi::default().with_canary(response("experimental_success", vec![json!("10.0.0.2")])),
    );
    *api.continue_fails.lock().unwrap() = true;
    let (coordinator, registry, notifications) = coordinator(api.clone());

    coordinator.trigger_canary(&playbook()).await.unwrap().unwrap();
    let err = coordinator.continue_rollout(&playbook()).await.unwrap_err();

    assert_eq!(err.user_message(), "session expired");
    assert!(coordinator.pending(&playbook()).is_none());
    assert_eq!(registry.state(&playbook()), RunState::Failed);
    assert!(!registry.is_running(&playbook()));

    let last = notifications.drain().pop().unwrap();
    assert_eq!(last.kind, NotificationKind::Error);
    assert!(last.message.contains("session expired"));
}

#[tokio::test]
async fn test_canary_on_running_task_sends_nothing() {
    let api = Arc::new(FakeApi::default().with_canary(response("experimental_success", vec![])));
    let (coordinator, registry, _) = coordinator(api.clone());

    registry.try_begin(&playbook());
    assert!(coordinator.trigger_canary(&playbook()).await.unwrap().is_none());
    assert_eq!(api.canaries(), 0);
}

#[tokio::test]
async fn test_canary_trigger_error_clears_flag() {
    let api = Arc::new(FakeApi::default());
    let (coordinator, registry, _) = coordinator(api.clone());

    let err = coordinator.trigger_canary(&playbook()).await.unwrap_err();

    assert_eq!(err.user_message(), "no hosts in group");
    assert!(!registry.is_running(&playbook()));
    assert!(coordinator.pending(&playbook()).is_none());
}

#[tokio::test]
async fn test_unsupported_kind_is_rejected() {
    let api = Arc::new(FakeApi::default());
    let (coordinator, _, notifications) = coordinator(api.clone());

    let deployment = TaskRef::new(TaskKind::Deployment, 1);
    assert!(coordinator.trigger_canary(&deployment).await.unwrap_err().is_validation());
    assert_eq!(api.canaries(), 0);
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn test_continue_after_dismiss_sends_nothing() {
    let api = Arc::new(
        FakeApi::default().with_canary(response("experimental_success", vec![json!("10.0.0.2")])),
    );
    let (coordinator, registry, _) = coordinator(api.clone());

    coordinator.trigger_canary(&playbook()).await.unwrap().unwrap();
    assert!(coordinator.dismiss(&playbook()));

    let err = coordinator.continue_rollout(&playbook()).await.unwrap_err();
    assert!(err.is_validation());
    assert!(api.continue_requests.lock().unwrap().is_empty());
    assert!(!registry.is_running(&playbook()));
}

#[tokio::test]
async fn test_second_continue_sends_nothing() {
    let api = Arc::new(
        FakeApi::default().with_canary(response("experimental_success", vec![json!("10.0.0.2")])),
    );
    let (coordinator, registry, _) = coordinator(api.clone());

    coordinator.trigger_canary(&playbook()).await.unwrap().unwrap();
    coordinator.continue_rollout(&playbook()).await.unwrap();

    let err = coordinator.continue_rollout(&playbook()).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(api.continue_requests.lock().unwrap().len(), 1);
    assert_eq!(registry.state(&playbook()), RunState::Success);
}

#[tokio::test]
async fn test_unoffered_continue_keeps_result_open() {
    let api = Arc::new(FakeApi::default().with_canary(response("experimental_success", vec![])));
    let (coordinator, _, _) = coordinator(api.clone());

    coordinator.trigger_canary(&playbook()).await.unwrap().unwrap();
    assert!(coordinator.continue_rollout(&playbook()).await.is_err());

    // Still shown until the operator closes it
    assert!(coordinator.pending(&playbook()).is_some());
    assert!(coordinator.dismiss(&playbook()));
}
