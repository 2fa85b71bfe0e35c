//! Canary rollout result

use openapi_client::models::{CanaryResponse, ContinueRequest};
use serde::{Deserialize, Serialize};

use crate::models::execution::{ExecutionStatus, HostExecutionRecord};
use crate::models::task::TaskRef;

/// Outcome of the experimental host run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanaryStatus {
    ExperimentalSuccess,
    ExperimentalFailure,
}

impl CanaryStatus {
    /// Accepts both the rollout-level and the per-host spelling
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "experimental_success" | "success" => CanaryStatus::ExperimentalSuccess,
            _ => CanaryStatus::ExperimentalFailure,
        }
    }
}

/// A host the canary left for the continuation phase.
///
/// Holds the JSON value exactly as the backend sent it so that it can be
/// echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostTarget(serde_json::Value);

impl HostTarget {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Best-effort address for display
    pub fn address(&self) -> String {
        match &self.0 {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Object(map) => map
                .get("ip")
                .or_else(|| map.get("address"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.0.to_string()),
            other => other.to_string(),
        }
    }
}

/// Result of a canary trigger, alive until continued or dismissed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanaryResult {
    pub task: TaskRef,
    pub status: CanaryStatus,
    pub experimental_host: String,
    pub experimental_record: HostExecutionRecord,

    /// Snapshot taken at trigger time; never recomputed
    pub remaining_hosts: Vec<HostTarget>,

    pub session_name: String,
}

impl CanaryResult {
    pub fn from_response(task: TaskRef, response: CanaryResponse) -> Self {
        let status = CanaryStatus::from_wire(&response.status);

        let (record_status, output, error) = match response.experimental_result {
            Some(nested) => (
                ExecutionStatus::from_wire(&nested.status),
                nested.output,
                nested.error,
            ),
            None => (
                ExecutionStatus::from_wire(&response.status),
                response.output,
                response.error,
            ),
        };
        let record_status = record_status.unwrap_or(match status {
            CanaryStatus::ExperimentalSuccess => ExecutionStatus::Success,
            CanaryStatus::ExperimentalFailure => ExecutionStatus::Failed,
        });

        let experimental_record = HostExecutionRecord {
            session_name: response.session_name.clone(),
            host: response.experimental_host.clone(),
            status: record_status,
            output,
            error,
            executed_at: None,
        };

        Self {
            task,
            status,
            experimental_host: response.experimental_host,
            experimental_record,
            remaining_hosts: response
                .remaining_hosts
                .into_iter()
                .map(HostTarget::new)
                .collect(),
            session_name: response.session_name,
        }
    }

    /// Continuation is offered only after a successful canary with hosts left
    pub fn offers_continuation(&self) -> bool {
        self.status == CanaryStatus::ExperimentalSuccess && !self.remaining_hosts.is_empty()
    }

    /// Request body for the continuation, built from the snapshot only
    pub fn continue_request(&self) -> ContinueRequest {
        ContinueRequest {
            session_name: self.session_name.clone(),
            remaining_hosts: self
                .remaining_hosts
                .iter()
                .map(|h| h.as_value().clone())
                .collect(),
        }
    }
}
