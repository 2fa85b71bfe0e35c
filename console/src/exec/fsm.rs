//! Finite State Machine for one task's execution lifecycle

use serde::{Deserialize, Serialize};

use crate::models::ExecutionStatus;

/// Run state of a task as observed by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Nothing in flight
    Idle,

    /// Trigger sent, waiting for a terminal status
    Running,

    /// Last run succeeded
    Success,

    /// Last run failed
    Failed,
}

/// Run event
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Trigger request about to be sent
    Trigger,

    /// Terminal status observed
    Complete(ExecutionStatus),

    /// Trigger request failed
    Fail(String),

    /// Poller gave up without a terminal status
    Timeout,

    /// Poller read a status that is neither running nor terminal
    Stop(Option<ExecutionStatus>),

    /// Acknowledge the last outcome
    Reset,
}

/// Per-task run FSM
#[derive(Debug, Clone)]
pub struct TaskRunFsm {
    state: RunState,
    last_known: Option<ExecutionStatus>,
    error: Option<String>,
}

impl TaskRunFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            last_known: None,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Last status reported by the backend, terminal or not
    pub fn last_known(&self) -> Option<ExecutionStatus> {
        self.last_known
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RunEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (RunState::Idle | RunState::Success | RunState::Failed, RunEvent::Trigger) => {
                self.error = None;
                self.last_known = Some(ExecutionStatus::Running);
                RunState::Running
            }

            (RunState::Running, RunEvent::Complete(status)) if status.is_terminal() => {
                self.last_known = Some(*status);
                match status {
                    ExecutionStatus::Success => RunState::Success,
                    _ => RunState::Failed,
                }
            }
            (RunState::Running, RunEvent::Fail(err)) => {
                self.error = Some(err.clone());
                self.last_known = Some(ExecutionStatus::Failed);
                RunState::Failed
            }
            // Last known status stays non-terminal; the user re-checks manually
            (RunState::Running, RunEvent::Timeout) => RunState::Idle,
            (RunState::Running, RunEvent::Stop(status)) => {
                if let Some(status) = status {
                    self.last_known = Some(*status);
                }
                RunState::Idle
            }

            (RunState::Success | RunState::Failed, RunEvent::Reset) => {
                self.error = None;
                RunState::Idle
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for TaskRunFsm {
    fn default() -> Self {
        Self::new()
    }
}
