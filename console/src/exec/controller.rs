//! Execution controller: trigger, commit or hand off to the status poller

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::errors::ConsoleError;
use crate::exec::api::ExecutionApi;
use crate::exec::poller::{self, PollHandle, PollOutcome};
use crate::exec::registry::RunningTasks;
use crate::models::{ExecutableTask, ExecutionStatus, TaskRef};
use crate::notify::{NotificationKind, NotificationQueue};

/// What a trigger call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The task was already running; nothing was sent
    Rejected,

    /// The backend reported a terminal status synchronously
    Completed(ExecutionStatus),

    /// No terminal status yet; a status poller took over
    Polling { session_name: Option<String> },
}

/// Drives trigger, running and terminal transitions of tasks
pub struct ExecutionController {
    api: Arc<dyn ExecutionApi>,
    registry: Arc<RunningTasks>,
    notifications: Arc<NotificationQueue>,
    poller_options: poller::Options,
    pollers: Mutex<HashMap<TaskRef, PollHandle>>,
}

impl ExecutionController {
    pub fn new(
        api: Arc<dyn ExecutionApi>,
        registry: Arc<RunningTasks>,
        notifications: Arc<NotificationQueue>,
        poller_options: poller::Options,
    ) -> Self {
        Self {
            api,
            registry,
            notifications,
            poller_options,
            pollers: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_running(&self, task: &TaskRef) -> bool {
        self.registry.is_running(task)
    }

    /// Trigger one execution of the task.
    ///
    /// Validation failures return before anything is sent. A task that is
    /// already running is rejected without a request.
    pub async fn trigger(&self, task: &ExecutableTask) -> Result<TriggerOutcome, ConsoleError> {
        task.validate_for_trigger()?;

        let task_ref = task.task_ref();
        if self.registry.is_running(&task_ref) {
            info!("Task {} is already running, ignoring trigger", task_ref);
            return Ok(TriggerOutcome::Rejected);
        }

        // Acknowledge first so a running indicator never shows up unannounced
        self.notifications.push(NotificationKind::Success, format!("{} started", task.name));
        if !self.registry.try_begin(&task_ref) {
            return Ok(TriggerOutcome::Rejected);
        }

        info!("Triggering {} ({})", task_ref, task.name);
        let response = match self.api.execute(task).await {
            Ok(response) => response,
            Err(e) => {
                error!("Trigger of {} failed: {}", task_ref, e);
                self.registry.fail(&task_ref, e.to_string());
                self.notifications.push(
                    NotificationKind::Error,
                    format!("{} failed to start: {}", task.name, e.user_message()),
                );
                return Err(e);
            }
        };

        match response.status {
            Some(status) if status.is_terminal() => {
                info!("Task {} completed synchronously with {}", task_ref, status);
                self.registry.complete(&task_ref, status);
                self.notify_completion(&task.name, status, response.message.as_deref());
                Ok(TriggerOutcome::Completed(status))
            }
            _ => {
                self.start_polling(task_ref);
                Ok(TriggerOutcome::Polling {
                    session_name: response.session_name,
                })
            }
        }
    }

    fn notify_completion(&self, name: &str, status: ExecutionStatus, message: Option<&str>) {
        let detail = message.map(|m| format!(": {}", m)).unwrap_or_default();
        match status {
            ExecutionStatus::Success => {
                self.notifications.push(
                    NotificationKind::Success,
                    format!("{} succeeded{}", name, detail),
                );
            }
            _ => {
                self.notifications.push(
                    NotificationKind::Error,
                    format!("{} {}{}", name, status, detail),
                );
            }
        }
    }

    fn start_polling(&self, task: TaskRef) {
        let handle = PollHandle::spawn(
            self.poller_options.clone(),
            self.api.clone(),
            task,
            self.registry.clone(),
            self.notifications.clone(),
        );
        let mut pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut previous) = pollers.insert(task, handle) {
            warn!("Replacing stale status poller for {}", task);
            previous.cancel();
        }
    }

    /// Whether a status poller is active for the task
    pub fn is_polling(&self, task: &TaskRef) -> bool {
        let pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
        pollers.get(task).is_some_and(|handle| handle.is_active())
    }

    /// Stop polling the task. The running flag is cleared by the poller.
    pub fn cancel_polling(&self, task: &TaskRef) -> bool {
        let mut pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
        match pollers.get_mut(task) {
            Some(handle) if handle.is_active() => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for the task's poller to stop, if there is one
    pub async fn wait_for(&self, task: &TaskRef) -> Option<PollOutcome> {
        let handle = {
            let mut pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
            pollers.remove(task)
        };
        match handle {
            Some(handle) => Some(handle.wait().await),
            None => None,
        }
    }
}
