//! Session log browser

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::errors::ConsoleError;
use crate::exec::api::ExecutionApi;
use crate::models::{ExecutionSession, HostExecutionRecord, TaskRef};
use crate::notify::{NotificationKind, NotificationQueue};
use crate::sessions::naming::format_session_name;

/// Records of one host within a session
#[derive(Debug, Clone, PartialEq)]
pub struct HostLogs {
    pub host: String,
    pub records: Vec<HostExecutionRecord>,
}

/// Per-host logs of one session, hosts in server order
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLogs {
    pub task: TaskRef,
    pub session_name: String,
    pub hosts: Vec<HostLogs>,
    selected: Option<usize>,
}

impl SessionLogs {
    /// Group records by host, keeping the order hosts first appear in
    pub fn from_records(
        task: TaskRef,
        session_name: &str,
        records: Vec<HostExecutionRecord>,
    ) -> Self {
        let mut hosts: Vec<HostLogs> = Vec::new();
        for record in records {
            match hosts.iter_mut().find(|h| h.host == record.host) {
                Some(group) => group.records.push(record),
                None => hosts.push(HostLogs {
                    host: record.host.clone(),
                    records: vec![record],
                }),
            }
        }

        Self {
            task,
            session_name: session_name.to_string(),
            hosts,
            selected: None,
        }
    }

    /// Session name as shown to the operator
    pub fn display_name(&self) -> String {
        format_session_name(&self.session_name, self.task.kind)
    }

    pub fn host_names(&self) -> Vec<&str> {
        self.hosts.iter().map(|h| h.host.as_str()).collect()
    }

    /// Selected host, defaulting to the first one
    pub fn selected_host(&self) -> Option<&HostLogs> {
        self.hosts.get(self.selected.unwrap_or(0))
    }

    /// Select a host by name. Returns false if the session has no such host.
    pub fn select_host(&mut self, host: &str) -> bool {
        match self.hosts.iter().position(|h| h.host == host) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }
}

/// Lists sessions of a task and fetches their per-host logs
pub struct SessionLogBrowser {
    api: Arc<dyn ExecutionApi>,
    notifications: Arc<NotificationQueue>,
}

impl SessionLogBrowser {
    pub fn new(api: Arc<dyn ExecutionApi>, notifications: Arc<NotificationQueue>) -> Self {
        Self { api, notifications }
    }

    fn check_sessions(task: &TaskRef) -> Result<(), ConsoleError> {
        if !task.kind.supports_sessions() {
            return Err(ConsoleError::ValidationError(format!(
                "{} tasks do not record sessions",
                task.kind
            )));
        }
        Ok(())
    }

    /// Sessions of the task in server order (newest first)
    pub async fn list_sessions(
        &self,
        task: &TaskRef,
    ) -> Result<Vec<ExecutionSession>, ConsoleError> {
        Self::check_sessions(task)?;

        match self.api.list_sessions(task).await {
            Ok(sessions) => {
                info!("Found {} sessions for {}", sessions.len(), task);
                Ok(sessions)
            }
            Err(e) => {
                error!("Failed to list sessions of {}: {}", task, e);
                self.notifications.push(
                    NotificationKind::Error,
                    format!("Could not load sessions: {}", e.user_message()),
                );
                Err(e)
            }
        }
    }

    /// Per-host logs of one session
    pub async fn select_session(
        &self,
        task: &TaskRef,
        session_name: &str,
    ) -> Result<SessionLogs, ConsoleError> {
        Self::check_sessions(task)?;
        if session_name.trim().is_empty() {
            return Err(ConsoleError::ValidationError(
                "No session selected".to_string(),
            ));
        }

        match self.api.get_logs(task, session_name).await {
            Ok(records) => {
                debug!(
                    "Fetched {} records of session {} for {}",
                    records.len(),
                    session_name,
                    task
                );
                Ok(SessionLogs::from_records(*task, session_name, records))
            }
            Err(e) => {
                error!("Failed to fetch logs of session {}: {}", session_name, e);
                self.notifications.push(
                    NotificationKind::Error,
                    format!("Could not load logs: {}", e.user_message()),
                );
                Err(e)
            }
        }
    }
}
