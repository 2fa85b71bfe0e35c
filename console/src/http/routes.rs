//! Backend route definitions

use crate::models::{HostId, TaskKind, TaskRef};

/// Backend route patterns
pub struct Routes;

impl Routes {
    /// Task collection for a kind
    pub fn tasks(kind: TaskKind) -> String {
        kind.collection().to_string()
    }

    /// Trigger an execution
    pub fn execute(task: &TaskRef) -> String {
        format!("{}/{}/execute", task.kind.collection(), task.id)
    }

    /// Run on one experimental host first
    pub fn experimental(task: &TaskRef) -> String {
        format!("{}/{}/experimental", task.kind.collection(), task.id)
    }

    /// Continue a canary rollout on the remaining hosts
    pub fn continue_execution(task: &TaskRef) -> String {
        format!("{}/{}/continue", task.kind.collection(), task.id)
    }

    /// Execution sessions of a task
    pub fn sessions(task: &TaskRef) -> String {
        format!("{}/{}/sessions", task.kind.collection(), task.id)
    }

    /// Per-host logs of a session (session name goes in the query string)
    pub fn logs(task: &TaskRef) -> String {
        format!("{}/{}/logs", task.kind.collection(), task.id)
    }

    /// Current execution status of a task
    pub fn status(task: &TaskRef) -> String {
        format!("{}/{}/status", task.kind.collection(), task.id)
    }

    /// All host groups
    pub fn host_groups() -> String {
        "/hostgroups".to_string()
    }

    /// Hosts of one group
    pub fn group_hosts(group_id: i64) -> String {
        format!("/hostgroups/{}/hosts", group_id)
    }

    /// Host creation
    pub fn hosts() -> String {
        "/hosts".to_string()
    }

    /// Terminal channel path, relative to the WebSocket base
    pub fn terminal(host_id: HostId) -> String {
        format!("/terminal/{}", host_id)
    }
}
