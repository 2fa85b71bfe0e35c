//! API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host as returned by `/hostgroups/{id}/hosts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub id: i64,
    pub ip: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub host_group_id: Option<i64>,
    #[serde(default)]
    pub os_label: Option<String>,
}

/// Host group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroupInfo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Host creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHostRequest {
    pub ip: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub host_group_id: i64,
}

/// Task summary shared by scripts, playbooks and deployment jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub host_group_id: Option<i64>,
    /// Script or playbook body
    #[serde(default)]
    pub content: Option<String>,
    /// Docker template command
    #[serde(default)]
    pub docker_command: Option<String>,
    /// Deployment job repository
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    /// Deployment jobs carry their own status
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `POST {collection}/{id}/execute`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Synchronous command output (docker templates)
    #[serde(default)]
    pub result: Option<String>,
}

/// Docker command execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerExecuteRequest {
    pub host_id: i64,
    pub docker_command: String,
}

/// Response of `GET {collection}/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub status: String,
}

/// Execution session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSessionInfo {
    #[serde(default)]
    pub id: Option<i64>,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
}

/// Per-host execution log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogInfo {
    #[serde(default)]
    pub id: Option<i64>,
    pub host: String,
    pub status: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
    /// Scripts and playbooks use `executed_at`, deployments `deployed_at`
    #[serde(default, alias = "deployed_at")]
    pub executed_at: Option<DateTime<Utc>>,
}

/// Nested experimental record (older backends)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentalRecordInfo {
    pub status: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
}

/// Response of `POST {collection}/{id}/experimental`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryResponse {
    pub session_name: String,
    pub experimental_host: String,
    pub status: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: String,
    /// Kept as raw JSON so the exact values can be echoed back on continue
    #[serde(default)]
    pub remaining_hosts: Vec<serde_json::Value>,
    #[serde(default)]
    pub experimental_result: Option<ExperimentalRecordInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST {collection}/{id}/continue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueRequest {
    pub session_name: String,
    pub remaining_hosts: Vec<serde_json::Value>,
}

/// Generic acknowledgement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
