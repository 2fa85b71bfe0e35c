//! Uniform execution capability interface over all task kinds

use async_trait::async_trait;
use openapi_client::models::{ContinueRequest, ExecuteResponse};
use tracing::debug;

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::models::{
    CanaryResult, ExecutableTask, ExecutionSession, ExecutionStatus, HostExecutionRecord, TaskKind,
    TaskRef,
};

/// What a trigger request reported synchronously
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerResponse {
    /// Terminal or intermediate status; `None` means the caller has to poll
    pub status: Option<ExecutionStatus>,
    pub session_name: Option<String>,
    pub message: Option<String>,
}

impl TriggerResponse {
    fn from_wire(kind: TaskKind, response: ExecuteResponse) -> Self {
        let status = match response.status.as_deref().and_then(ExecutionStatus::from_wire) {
            Some(status) => Some(status),
            // Docker commands run to completion inside the request
            None if kind == TaskKind::DockerCommand => Some(ExecutionStatus::Success),
            None => None,
        };
        Self {
            status,
            session_name: response.session_name,
            message: response.message.or(response.result),
        }
    }
}

/// Execution operations shared by every task kind
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Trigger an execution of the task
    async fn execute(&self, task: &ExecutableTask) -> Result<TriggerResponse, ConsoleError>;

    /// Run the task on one host chosen by the server
    async fn execute_canary(&self, task: &TaskRef) -> Result<CanaryResult, ConsoleError>;

    /// Run the task on the hosts the canary left over
    async fn continue_execution(
        &self,
        task: &TaskRef,
        request: &ContinueRequest,
    ) -> Result<(), ConsoleError>;

    /// Sessions of a task, in server order
    async fn list_sessions(&self, task: &TaskRef) -> Result<Vec<ExecutionSession>, ConsoleError>;

    /// Per-host records of one session, in server order
    async fn get_logs(
        &self,
        task: &TaskRef,
        session_name: &str,
    ) -> Result<Vec<HostExecutionRecord>, ConsoleError>;

    /// Current status; `None` when the backend reports something unrecognized
    async fn task_status(&self, task: &TaskRef) -> Result<Option<ExecutionStatus>, ConsoleError>;
}

#[async_trait]
impl ExecutionApi for HttpClient {
    async fn execute(&self, task: &ExecutableTask) -> Result<TriggerResponse, ConsoleError> {
        let task_ref = task.task_ref();
        let response = match task.kind {
            TaskKind::DockerCommand => {
                let host_id = task.target_host_id.ok_or_else(|| {
                    ConsoleError::ValidationError(format!(
                        "No target host selected for {}",
                        task.name
                    ))
                })?;
                self.execute_docker_command(&task_ref, host_id, &task.payload).await?
            }
            TaskKind::Script | TaskKind::Playbook | TaskKind::Deployment => {
                self.execute_task(&task_ref).await?
            }
        };
        debug!("Trigger response for {}: {:?}", task_ref, response);
        Ok(TriggerResponse::from_wire(task.kind, response))
    }

    async fn execute_canary(&self, task: &TaskRef) -> Result<CanaryResult, ConsoleError> {
        let response = self.execute_experimental(task).await?;
        Ok(CanaryResult::from_response(*task, response))
    }

    async fn continue_execution(
        &self,
        task: &TaskRef,
        request: &ContinueRequest,
    ) -> Result<(), ConsoleError> {
        HttpClient::continue_execution(self, task, request).await?;
        Ok(())
    }

    async fn list_sessions(&self, task: &TaskRef) -> Result<Vec<ExecutionSession>, ConsoleError> {
        let sessions = self.get_sessions(task).await?;
        Ok(sessions
            .into_iter()
            .map(|info| ExecutionSession::from_info(*task, info))
            .collect())
    }

    async fn get_logs(
        &self,
        task: &TaskRef,
        session_name: &str,
    ) -> Result<Vec<HostExecutionRecord>, ConsoleError> {
        let logs = HttpClient::get_logs(self, task, session_name).await?;
        Ok(logs
            .into_iter()
            .map(|info| HostExecutionRecord::from_info(session_name, info))
            .collect())
    }

    async fn task_status(&self, task: &TaskRef) -> Result<Option<ExecutionStatus>, ConsoleError> {
        let response = self.get_task_status(task).await?;
        Ok(ExecutionStatus::from_wire(&response.status))
    }
}
