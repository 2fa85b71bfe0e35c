//! Running-task registry

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::exec::fsm::{RunEvent, RunState, TaskRunFsm};
use crate::models::{ExecutionStatus, TaskRef};

/// Run state of every task the console has touched, keyed by task.
///
/// Shared by the controller, the canary coordinator and every poller through
/// an `Arc`; nothing else holds run state.
#[derive(Default)]
pub struct RunningTasks {
    tasks: RwLock<HashMap<TaskRef, TaskRunFsm>>,
}

impl RunningTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the task has an execution in flight
    pub fn is_running(&self, task: &TaskRef) -> bool {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks.get(task).is_some_and(|fsm| fsm.is_running())
    }

    /// Current run state, `Idle` for unknown tasks
    pub fn state(&self, task: &TaskRef) -> RunState {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks.get(task).map(|fsm| fsm.state()).unwrap_or(RunState::Idle)
    }

    /// Last status seen for the task
    pub fn last_known(&self, task: &TaskRef) -> Option<ExecutionStatus> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks.get(task).and_then(|fsm| fsm.last_known())
    }

    /// Tasks currently in flight
    pub fn running(&self) -> Vec<TaskRef> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks
            .iter()
            .filter(|(_, fsm)| fsm.is_running())
            .map(|(task, _)| *task)
            .collect()
    }

    /// Flip the running flag. Returns false if the task is already running.
    pub fn try_begin(&self, task: &TaskRef) -> bool {
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        let fsm = tasks.entry(*task).or_default();
        match fsm.process(RunEvent::Trigger) {
            Ok(()) => {
                debug!("Task {} marked running", task);
                true
            }
            Err(_) => false,
        }
    }

    /// Commit a terminal status and clear the running flag
    pub fn complete(&self, task: &TaskRef, status: ExecutionStatus) {
        let event = if status.is_terminal() {
            RunEvent::Complete(status)
        } else {
            RunEvent::Fail(format!("Unexpected non-terminal status {}", status))
        };
        self.apply(task, event);
    }

    /// Record a failed request and clear the running flag
    pub fn fail(&self, task: &TaskRef, error: impl Into<String>) {
        self.apply(task, RunEvent::Fail(error.into()));
    }

    /// Clear the running flag without a terminal status
    pub fn time_out(&self, task: &TaskRef) {
        self.apply(task, RunEvent::Timeout);
    }

    /// Clear the running flag after a non-terminal, non-running status
    pub fn stop(&self, task: &TaskRef, status: Option<ExecutionStatus>) {
        self.apply(task, RunEvent::Stop(status));
    }

    fn apply(&self, task: &TaskRef, event: RunEvent) {
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        let fsm = tasks.entry(*task).or_default();
        if let Err(e) = fsm.process(event) {
            warn!("Ignoring run event for {}: {}", task, e);
        }
    }
}
