//! Executable task models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;
use crate::models::host::HostId;

/// Task identifier, unique within a task kind
pub type TaskId = i64;

/// Category of executable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    /// Shell script
    Script,

    /// Ansible playbook
    Playbook,

    /// Git-based deployment job
    Deployment,

    /// Single docker command against one host
    DockerCommand,
}

/// How a task kind encodes its session names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEncoding {
    /// Already `YYYY-MM-DD_HH:mm:ss`
    Canonical,

    /// `<prefix>_<unixEpochSeconds>`
    EpochSuffix,
}

impl TaskKind {
    /// All kinds, in display order
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Script,
        TaskKind::Playbook,
        TaskKind::Deployment,
        TaskKind::DockerCommand,
    ];

    /// Collection path on the backend
    pub fn collection(&self) -> &'static str {
        match self {
            TaskKind::Script => "/scripts",
            TaskKind::Playbook => "/ansible",
            TaskKind::Deployment => "/deployment",
            TaskKind::DockerCommand => "/docker-templates",
        }
    }

    /// Whether executions of this kind produce browsable sessions
    pub fn supports_sessions(&self) -> bool {
        !matches!(self, TaskKind::DockerCommand)
    }

    /// Whether this kind can be rolled out through an experimental host first
    pub fn supports_canary(&self) -> bool {
        matches!(self, TaskKind::Script | TaskKind::Playbook)
    }

    /// Session name encoding used by the backend for this kind
    pub fn session_encoding(&self) -> SessionEncoding {
        match self {
            TaskKind::Playbook => SessionEncoding::EpochSuffix,
            _ => SessionEncoding::Canonical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Script => "script",
            TaskKind::Playbook => "playbook",
            TaskKind::Deployment => "deployment",
            TaskKind::DockerCommand => "dockerCommand",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "script" | "scripts" | "shell" => Ok(TaskKind::Script),
            "playbook" | "playbooks" | "ansible" => Ok(TaskKind::Playbook),
            "deployment" | "deploy" => Ok(TaskKind::Deployment),
            "dockercommand" | "docker" => Ok(TaskKind::DockerCommand),
            _ => Err(ConsoleError::ValidationError(format!("Unknown task kind: {}", s))),
        }
    }
}

/// Identity of a task: kind plus id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub kind: TaskKind,
    pub id: TaskId,
}

impl TaskRef {
    pub fn new(kind: TaskKind, id: TaskId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

impl FromStr for TaskRef {
    type Err = ConsoleError;

    /// Parses `<kind>:<id>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s.split_once(':').ok_or_else(|| {
            ConsoleError::ValidationError(format!("Expected <kind>:<id>, got: {}", s))
        })?;
        let id = id
            .trim()
            .parse::<TaskId>()
            .map_err(|_| ConsoleError::ValidationError(format!("Invalid task id: {}", id)))?;
        Ok(TaskRef::new(kind.trim().parse()?, id))
    }
}

/// An executable unit bound to a host group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutableTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub name: String,

    /// Script body, playbook content, repository reference or docker command
    pub payload: String,

    pub host_group_id: Option<i64>,

    /// Docker commands run against one explicitly chosen host
    pub target_host_id: Option<HostId>,
}

impl ExecutableTask {
    pub fn task_ref(&self) -> TaskRef {
        TaskRef::new(self.kind, self.id)
    }

    /// Check required fields before anything is sent
    pub fn validate_for_trigger(&self) -> Result<(), ConsoleError> {
        match self.kind {
            TaskKind::DockerCommand => {
                if self.target_host_id.is_none() {
                    return Err(ConsoleError::ValidationError(format!(
                        "No target host selected for {}",
                        self.name
                    )));
                }
                if self.payload.trim().is_empty() {
                    return Err(ConsoleError::ValidationError(format!(
                        "No docker command given for {}",
                        self.name
                    )));
                }
            }
            _ => {
                if self.host_group_id.is_none() {
                    return Err(ConsoleError::ValidationError(format!(
                        "No host group selected for {}",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}
