//! Backend client tests against a mock server

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use runme_console::errors::ConsoleError;
use runme_console::exec::api::ExecutionApi;
use runme_console::http::client::HttpClient;
use runme_console::models::{ExecutionStatus, TaskKind, TaskRef};
use runme_console::registry::tasks::{NewHost, TaskRegistry};

use crate::fakes::script;

fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_execute_without_status_means_poll() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/scripts/1/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_name": "script-1_2024-05-01_12:00:00",
            "message": "started"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = ExecutionApi::execute(&client(&server), &script(1)).await.unwrap();

    assert_eq!(response.status, None);
    assert_eq!(
        response.session_name.as_deref(),
        Some("script-1_2024-05-01_12:00:00")
    );
}

#[tokio::test]
async fn test_docker_command_targets_one_host() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/docker-templates/4/execute"))
        .and(body_json(json!({"host_id": 9, "docker_command": "docker ps -a"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "CONTAINER ID"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut task = script(4);
    task.kind = TaskKind::DockerCommand;
    task.payload = "docker ps -a".to_string();
    task.target_host_id = Some(9);

    let response = ExecutionApi::execute(&client(&server), &task).await.unwrap();
    assert_eq!(response.status, Some(ExecutionStatus::Success));
    assert_eq!(response.message.as_deref(), Some("CONTAINER ID"));
}

#[tokio::test]
async fn test_logs_query_is_encoded() {
    let server = MockServer::start().await;
    let session = "site_1700000000 & co";
    Mock::given(method("GET"))
        .and(path("/deployment/8/logs"))
        .and(query_param("session_name", session))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"host": "10.0.0.1", "status": "success", "output": "done", "deployed_at": "2024-05-01T12:00:00Z"},
            {"host": "10.0.0.2", "status": "mystery"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let task = TaskRef::new(TaskKind::Deployment, 8);
    let records = ExecutionApi::get_logs(&client(&server), &task, session)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].session_name, session);
    assert_eq!(records[0].status, ExecutionStatus::Success);
    assert!(records[0].executed_at.is_some());
    assert_eq!(records[1].status, ExecutionStatus::Pending);
    assert_eq!(records[1].output, "");
}

#[tokio::test]
async fn test_null_sessions_mean_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scripts/3/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("null", "application/json"))
        .mount(&server)
        .await;

    let task = TaskRef::new(TaskKind::Script, 3);
    let sessions = ExecutionApi::list_sessions(&client(&server), &task)
        .await
        .unwrap();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_error_body_becomes_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ansible/2/execute"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "playbook is locked"})),
        )
        .mount(&server)
        .await;

    let task = TaskRef::new(TaskKind::Playbook, 2);
    let err = client(&server).execute_task(&task).await.unwrap_err();

    match &err {
        ConsoleError::RequestError { status, .. } => assert_eq!(*status, 409),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.user_message(), "playbook is locked");
}

#[tokio::test]
async fn test_status_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scripts/1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scripts/2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued?"})))
        .mount(&server)
        .await;

    let client = client(&server);
    let done = client.task_status(&TaskRef::new(TaskKind::Script, 1)).await.unwrap();
    let unknown = client.task_status(&TaskRef::new(TaskKind::Script, 2)).await.unwrap();

    assert_eq!(done, Some(ExecutionStatus::Success));
    assert_eq!(unknown, None);
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hostgroups"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "web"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::with_token(
        &server.uri(),
        Duration::from_secs(5),
        SecretString::from("t0k3n".to_string()),
    )
    .unwrap();
    let groups = TaskRegistry::new(Arc::new(client)).list_groups().await.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "web");
}

#[tokio::test]
async fn test_canary_round_trip_echoes_hosts() {
    let server = MockServer::start().await;
    let remaining = json!([{"id": 2, "ip": "10.0.0.2", "port": 22}, "10.0.0.3"]);
    Mock::given(method("POST"))
        .and(path("/ansible/4/experimental"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_name": "site_experimental_1700000000",
            "experimental_host": "10.0.0.1",
            "status": "experimental_success",
            "remaining_hosts": remaining.clone(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ansible/4/continue"))
        .and(body_json(json!({
            "session_name": "site_experimental_1700000000",
            "remaining_hosts": remaining,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "continued"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let task = TaskRef::new(TaskKind::Playbook, 4);
    let result = client.execute_canary(&task).await.unwrap();
    assert!(result.offers_continuation());

    ExecutionApi::continue_execution(&client, &task, &result.continue_request())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_task_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/deployment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "api", "host_group_id": 0, "github_url": "https://github.com/acme/api", "branch": "main"},
            {"id": 2, "name": "web", "host_group_id": 3, "github_url": "https://github.com/acme/web"}
        ])))
        .mount(&server)
        .await;

    let registry = TaskRegistry::new(Arc::new(client(&server)));

    let api = registry.get_task(TaskKind::Deployment, 1).await.unwrap();
    assert_eq!(api.payload, "https://github.com/acme/api@main");
    assert_eq!(api.host_group_id, None);

    let web = registry.get_task(TaskKind::Deployment, 2).await.unwrap();
    assert_eq!(web.host_group_id, Some(3));

    match registry.get_task(TaskKind::Deployment, 3).await {
        Err(ConsoleError::NotFound(_)) => {}
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_batch_add_keeps_earlier_successes() {
    let server = MockServer::start().await;
    for (ip, id) in [("10.0.0.1", 11), ("10.0.0.3", 13)] {
        Mock::given(method("POST"))
            .and(path("/hosts"))
            .and(body_partial_json(json!({"ip": ip, "host_group_id": 5})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": id, "ip": ip, "port": 22})),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/hosts"))
        .and(body_partial_json(json!({"ip": "10.0.0.2"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "duplicate ip"})))
        .mount(&server)
        .await;

    let hosts = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        .into_iter()
        .map(|ip| NewHost {
            address: ip.to_string(),
            port: 22,
            username: "ops".to_string(),
            password: SecretString::from("hunter2".to_string()),
        })
        .collect();

    let registry = TaskRegistry::new(Arc::new(client(&server)));
    let report = registry.add_hosts(5, hosts).await;

    let added: Vec<_> = report.succeeded().map(|item| item.address.as_str()).collect();
    assert_eq!(added, vec!["10.0.0.1", "10.0.0.3"]);
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].result.as_ref().unwrap_err(), "duplicate ip");

    match report.into_result() {
        Err(ConsoleError::PartialBatchFailure { failed, total }) => {
            assert_eq!((failed, total), (1, 3));
        }
        other => panic!("unexpected: {:?}", other.map(|hosts| hosts.len())),
    }
}

#[tokio::test]
async fn test_group_hosts_default_port() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hostgroups/3/hosts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "ip": "10.0.0.7", "username": "ops"},
            {"id": 8, "ip": "10.0.0.8", "port": 2222, "os_label": "debian"}
        ])))
        .mount(&server)
        .await;

    let registry = TaskRegistry::new(Arc::new(client(&server)));
    let hosts = registry.get_group_hosts(3).await.unwrap();

    let summary: Vec<_> = hosts.iter().map(|h| (h.address.as_str(), h.port)).collect();
    assert_eq!(summary, vec![("10.0.0.7", 22), ("10.0.0.8", 2222)]);
    assert_eq!(hosts[0].credential_ref.as_deref(), Some("ops"));
    assert_eq!(hosts[1].os_label.as_deref(), Some("debian"));
}
