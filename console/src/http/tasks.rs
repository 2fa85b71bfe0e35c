//! Task execution API client

use openapi_client::models::{
    AckResponse, CanaryResponse, ContinueRequest, DockerExecuteRequest, ExecuteResponse,
    ExecutionLogInfo, ExecutionSessionInfo, TaskStatusResponse, TaskSummary,
};

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::http::routes::Routes;
use crate::models::{HostId, TaskKind, TaskRef};

impl HttpClient {
    /// List the tasks of one kind
    pub async fn list_task_summaries(
        &self,
        kind: TaskKind,
    ) -> Result<Vec<TaskSummary>, ConsoleError> {
        let summaries: Option<Vec<TaskSummary>> = self.get(&Routes::tasks(kind)).await?;
        Ok(summaries.unwrap_or_default())
    }

    /// Trigger an execution on the whole host group
    pub async fn execute_task(&self, task: &TaskRef) -> Result<ExecuteResponse, ConsoleError> {
        self.post_empty(&Routes::execute(task)).await
    }

    /// Run a docker command on one host
    pub async fn execute_docker_command(
        &self,
        task: &TaskRef,
        host_id: HostId,
        docker_command: &str,
    ) -> Result<ExecuteResponse, ConsoleError> {
        let body = DockerExecuteRequest {
            host_id,
            docker_command: docker_command.to_string(),
        };
        self.post(&Routes::execute(task), &body).await
    }

    /// Run on one server-chosen host
    pub async fn execute_experimental(
        &self,
        task: &TaskRef,
    ) -> Result<CanaryResponse, ConsoleError> {
        self.post_empty(&Routes::experimental(task)).await
    }

    /// Continue a canary rollout
    pub async fn continue_execution(
        &self,
        task: &TaskRef,
        request: &ContinueRequest,
    ) -> Result<AckResponse, ConsoleError> {
        self.post(&Routes::continue_execution(task), request).await
    }

    /// Get the execution sessions of a task
    pub async fn get_sessions(
        &self,
        task: &TaskRef,
    ) -> Result<Vec<ExecutionSessionInfo>, ConsoleError> {
        // The backend answers `null` for a task that never ran
        let sessions: Option<Vec<ExecutionSessionInfo>> = self.get(&Routes::sessions(task)).await?;
        Ok(sessions.unwrap_or_default())
    }

    /// Get the per-host logs of one session
    pub async fn get_logs(
        &self,
        task: &TaskRef,
        session_name: &str,
    ) -> Result<Vec<ExecutionLogInfo>, ConsoleError> {
        let logs: Option<Vec<ExecutionLogInfo>> = self
            .get_with_query(&Routes::logs(task), &[("session_name", session_name)])
            .await?;
        Ok(logs.unwrap_or_default())
    }

    /// Get the current status of a task
    pub async fn get_task_status(
        &self,
        task: &TaskRef,
    ) -> Result<TaskStatusResponse, ConsoleError> {
        self.get(&Routes::status(task)).await
    }
}
