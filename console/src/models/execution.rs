//! Execution status, session and per-host record models

use std::fmt;

use chrono::{DateTime, Utc};
use openapi_client::models::{ExecutionLogInfo, ExecutionSessionInfo};
use serde::{Deserialize, Serialize};

use crate::models::task::TaskRef;

/// Execution status of a task or of one host within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    #[serde(alias = "timeout", alias = "error")]
    Failed,
}

impl ExecutionStatus {
    /// Parse a status string as sent by the backend
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(ExecutionStatus::Pending),
            "running" => Some(ExecutionStatus::Running),
            "success" | "succeeded" | "completed" => Some(ExecutionStatus::Success),
            "failed" | "timeout" | "error" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }

    /// Whether the status ends an execution
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation of a task, as discovered through the session listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub session_name: String,
    pub created_at: DateTime<Utc>,
    pub task: TaskRef,
}

impl ExecutionSession {
    pub fn from_info(task: TaskRef, info: ExecutionSessionInfo) -> Self {
        Self {
            session_name: info.session_name,
            created_at: info.created_at,
            task,
        }
    }
}

/// Result of running a task on one host within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostExecutionRecord {
    pub session_name: String,
    pub host: String,
    pub status: ExecutionStatus,
    pub output: String,
    pub error: String,
    pub executed_at: Option<DateTime<Utc>>,
}

impl HostExecutionRecord {
    /// Build a record from the wire log, attaching the session it was fetched for.
    ///
    /// Unknown statuses are kept visible as `pending` rather than dropped.
    pub fn from_info(session_name: &str, info: ExecutionLogInfo) -> Self {
        Self {
            session_name: session_name.to_string(),
            host: info.host,
            status: ExecutionStatus::from_wire(&info.status).unwrap_or(ExecutionStatus::Pending),
            output: info.output,
            error: info.error,
            executed_at: info.executed_at,
        }
    }
}
