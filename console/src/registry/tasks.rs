//! Task registry: executable units and the host groups they target

use std::sync::Arc;

use openapi_client::models::{CreateHostRequest, TaskSummary};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::models::{ExecutableTask, Host, HostGroup, TaskKind};

/// Build a task from its backend summary
pub fn task_from_summary(kind: TaskKind, summary: TaskSummary) -> ExecutableTask {
    let payload = match kind {
        TaskKind::Script | TaskKind::Playbook => summary.content,
        TaskKind::DockerCommand => summary.docker_command,
        TaskKind::Deployment => summary.github_url.map(|url| match summary.branch {
            Some(branch) if !branch.is_empty() => format!("{}@{}", url, branch),
            _ => url,
        }),
    };

    ExecutableTask {
        id: summary.id,
        kind,
        name: summary.name,
        payload: payload.unwrap_or_default(),
        // Zero is how the backend says "no group"
        host_group_id: summary.host_group_id.filter(|id| *id > 0),
        target_host_id: None,
    }
}

/// A host to add to a group
#[derive(Debug)]
pub struct NewHost {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Outcome of adding one host
#[derive(Debug)]
pub struct BatchItem {
    pub address: String,
    pub result: Result<Host, String>,
}

/// Per-item outcome of a batch host add
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| item.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| item.result.is_err())
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Turn any failure into an error, for callers that need all-or-nothing
    pub fn into_result(self) -> Result<Vec<Host>, ConsoleError> {
        let total = self.items.len();
        let failed = self.failed().count();
        if failed > 0 {
            return Err(ConsoleError::PartialBatchFailure { failed, total });
        }
        Ok(self
            .items
            .into_iter()
            .filter_map(|item| item.result.ok())
            .collect())
    }
}

/// Read-only view of executable tasks and their host groups
pub struct TaskRegistry {
    client: Arc<HttpClient>,
}

impl TaskRegistry {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Tasks of one kind, in server order
    pub async fn list_tasks(&self, kind: TaskKind) -> Result<Vec<ExecutableTask>, ConsoleError> {
        let summaries = self.client.list_task_summaries(kind).await?;
        Ok(summaries
            .into_iter()
            .map(|summary| task_from_summary(kind, summary))
            .collect())
    }

    /// Find one task by id
    pub async fn get_task(&self, kind: TaskKind, id: i64) -> Result<ExecutableTask, ConsoleError> {
        self.list_tasks(kind)
            .await?
            .into_iter()
            .find(|task| task.id == id)
            .ok_or_else(|| ConsoleError::NotFound(format!("{} #{}", kind, id)))
    }

    /// All host groups, without their hosts
    pub async fn list_groups(&self) -> Result<Vec<HostGroup>, ConsoleError> {
        let groups = self.client.get_host_groups().await?;
        Ok(groups
            .into_iter()
            .map(|info| HostGroup::from_info(info, Vec::new()))
            .collect())
    }

    /// Current members of a group
    pub async fn get_group_hosts(&self, group_id: i64) -> Result<Vec<Host>, ConsoleError> {
        let hosts = self.client.get_group_hosts(group_id).await?;
        Ok(hosts.into_iter().map(Host::from).collect())
    }

    /// Add hosts one by one, in input order. Failures do not undo earlier
    /// successes.
    pub async fn add_hosts(&self, group_id: i64, hosts: Vec<NewHost>) -> BatchReport {
        let mut report = BatchReport::default();

        for host in hosts {
            let request = CreateHostRequest {
                ip: host.address.clone(),
                port: host.port,
                username: host.username,
                password: host.password.expose_secret().to_string(),
                host_group_id: group_id,
            };
            let result = match self.client.create_host(&request).await {
                Ok(info) => Ok(Host::from(info)),
                Err(e) => {
                    warn!("Failed to add host {}: {}", host.address, e);
                    Err(e.user_message())
                }
            };
            report.items.push(BatchItem {
                address: host.address,
                result,
            });
        }

        info!(
            "Added {} of {} hosts to group {}",
            report.succeeded().count(),
            report.items.len(),
            group_id
        );
        report
    }
}
