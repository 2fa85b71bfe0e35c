//! Canary rollout coordinator
//!
//! A canary run executes a task on one host the server picks from the
//! task's group. If it succeeds and hosts are left, the operator may
//! continue on exactly the host set the canary reported.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::errors::ConsoleError;
use crate::exec::api::ExecutionApi;
use crate::exec::registry::RunningTasks;
use crate::models::{CanaryResult, CanaryStatus, ExecutionStatus, TaskRef};
use crate::notify::{NotificationKind, NotificationQueue};

/// Coordinates canary runs and their continuation
pub struct CanaryRolloutCoordinator {
    api: Arc<dyn ExecutionApi>,
    registry: Arc<RunningTasks>,
    notifications: Arc<NotificationQueue>,
    pending: Mutex<HashMap<TaskRef, CanaryResult>>,
}

impl CanaryRolloutCoordinator {
    pub fn new(
        api: Arc<dyn ExecutionApi>,
        registry: Arc<RunningTasks>,
        notifications: Arc<NotificationQueue>,
    ) -> Self {
        Self {
            api,
            registry,
            notifications,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Run the task on one server-chosen host.
    ///
    /// Returns `Ok(None)` without sending anything if the task is already
    /// running.
    pub async fn trigger_canary(
        &self,
        task: &TaskRef,
    ) -> Result<Option<CanaryResult>, ConsoleError> {
        if !task.kind.supports_canary() {
            return Err(ConsoleError::ValidationError(format!(
                "{} tasks cannot be rolled out through a canary host",
                task.kind
            )));
        }
        if self.registry.is_running(task) {
            info!("Task {} is already running, ignoring canary trigger", task);
            return Ok(None);
        }

        self.notifications.push(NotificationKind::Info, format!("Canary run of {} started", task));
        if !self.registry.try_begin(task) {
            return Ok(None);
        }

        info!("Triggering canary run of {}", task);
        let result = match self.api.execute_canary(task).await {
            Ok(result) => result,
            Err(e) => {
                error!("Canary trigger of {} failed: {}", task, e);
                self.registry.fail(task, e.to_string());
                self.notifications.push(
                    NotificationKind::Error,
                    format!("Canary run of {} failed: {}", task, e.user_message()),
                );
                return Err(e);
            }
        };

        info!(
            "Canary of {} on {}: {:?}, {} hosts remaining (session {})",
            task,
            result.experimental_host,
            result.status,
            result.remaining_hosts.len(),
            result.session_name
        );
        match result.status {
            CanaryStatus::ExperimentalSuccess => {
                self.registry.complete(task, ExecutionStatus::Success);
                self.notifications.push(
                    NotificationKind::Success,
                    format!("Canary host {} succeeded", result.experimental_host),
                );
            }
            CanaryStatus::ExperimentalFailure => {
                self.registry.complete(task, ExecutionStatus::Failed);
                self.notifications.push(
                    NotificationKind::Error,
                    format!("Canary host {} failed", result.experimental_host),
                );
            }
        }

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.insert(*task, result.clone());
        Ok(Some(result))
    }

    /// Canary result awaiting a decision, if any
    pub fn pending(&self, task: &TaskRef) -> Option<CanaryResult> {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.get(task).cloned()
    }

    /// Whether the continue action should be offered for the task
    pub fn offers_continuation(&self, task: &TaskRef) -> bool {
        self.pending(task).is_some_and(|r| r.offers_continuation())
    }

    /// Close the canary result without continuing. Idempotent.
    pub fn dismiss(&self, task: &TaskRef) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(task).is_some()
    }

    /// Run the task on the hosts the canary reported as remaining.
    ///
    /// Consumes the stored canary result and sends its session name and
    /// host snapshot unchanged. Without a pending result that offers
    /// continuation nothing is sent. The result is gone once the request
    /// has been issued, whatever its outcome.
    pub async fn continue_rollout(&self, task: &TaskRef) -> Result<(), ConsoleError> {
        let result = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            let Some(result) = pending.remove(task) else {
                return Err(ConsoleError::ValidationError(format!(
                    "No canary result pending for {}",
                    task
                )));
            };
            if !result.offers_continuation() {
                pending.insert(*task, result);
                return Err(ConsoleError::ValidationError(format!(
                    "No continuation offered for {}",
                    task
                )));
            }
            if !self.registry.try_begin(task) {
                pending.insert(*task, result);
                return Err(ConsoleError::ValidationError(format!("{} is already running", task)));
            }
            result
        };

        let request = result.continue_request();
        info!(
            "Continuing {} on {} hosts (session {})",
            task,
            request.remaining_hosts.len(),
            request.session_name
        );
        let outcome = self.api.continue_execution(task, &request).await;

        match outcome {
            Ok(()) => {
                self.registry.complete(task, ExecutionStatus::Success);
                self.notifications.push(
                    NotificationKind::Success,
                    format!(
                        "{} continued on {} remaining hosts",
                        task,
                        request.remaining_hosts.len()
                    ),
                );
                Ok(())
            }
            Err(e) => {
                error!("Continuation of {} failed: {}", task, e);
                self.registry.fail(task, e.to_string());
                self.notifications.push(
                    NotificationKind::Error,
                    format!("Continuation of {} failed: {}", task, e.user_message()),
                );
                Err(e)
            }
        }
    }
}
