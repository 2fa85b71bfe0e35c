//! Status poller for triggers without a synchronous terminal status

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::api::ExecutionApi;
use crate::exec::registry::RunningTasks;
use crate::models::{ExecutionStatus, TaskRef};
use crate::notify::{NotificationKind, NotificationQueue};

/// Poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay before each status read
    pub interval: Duration,

    /// Status reads before giving up
    pub max_attempts: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

/// Why the poller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A terminal status was read
    Finished(ExecutionStatus),

    /// A status other than `running` that is not terminal either, or one
    /// the console does not recognize
    Stopped(Option<ExecutionStatus>),

    /// Attempt budget exhausted without a terminal status
    TimedOut { attempts: u32 },

    /// Stopped by the caller
    Cancelled,
}

/// Poll the task's status until it is no longer `running`.
///
/// The running flag is cleared in every stop case. A failed read counts as
/// an attempt and does not stop the loop.
pub async fn run<A, S, F>(
    options: &Options,
    api: &A,
    task: &TaskRef,
    registry: &RunningTasks,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> PollOutcome
where
    A: ExecutionApi + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Polling status of {} (max {} attempts)", task, options.max_attempts);

    for attempt in 1..=options.max_attempts {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Status poller for {} cancelled", task);
                registry.time_out(task);
                return PollOutcome::Cancelled;
            }
            _ = sleep_fn(options.interval) => {}
        }

        debug!("Status poll {}/{} for {}", attempt, options.max_attempts, task);
        match api.task_status(task).await {
            Ok(Some(status)) if status.is_terminal() => {
                info!("Task {} finished with status {}", task, status);
                registry.complete(task, status);
                return PollOutcome::Finished(status);
            }
            Ok(Some(ExecutionStatus::Running)) => {
                debug!("Task {} still running", task);
            }
            Ok(Some(status)) => {
                info!("Task {} is {}, no longer polling", task, status);
                registry.stop(task, Some(status));
                return PollOutcome::Stopped(Some(status));
            }
            Ok(None) => {
                warn!("Task {} reported an unrecognized status", task);
                registry.stop(task, None);
                return PollOutcome::Stopped(None);
            }
            Err(e) => {
                warn!("Status poll {} for {} failed: {}", attempt, task, e);
            }
        }
    }

    warn!("Task {} did not finish within {} status polls", task, options.max_attempts);
    registry.time_out(task);
    PollOutcome::TimedOut {
        attempts: options.max_attempts,
    }
}

/// A running poller that can be cancelled or awaited
pub struct PollHandle {
    task: TaskRef,
    cancel: Option<oneshot::Sender<()>>,
    join: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Start polling on the runtime. The outcome is also reported as a
    /// notification.
    pub fn spawn(
        options: Options,
        api: Arc<dyn ExecutionApi>,
        task: TaskRef,
        registry: Arc<RunningTasks>,
        notifications: Arc<NotificationQueue>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let shutdown_signal = Box::pin(async move {
            // A dropped handle detaches the poller instead of stopping it
            if cancel_rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        });

        let join = tokio::spawn(async move {
            let outcome = run(
                &options,
                api.as_ref(),
                &task,
                &registry,
                tokio::time::sleep,
                shutdown_signal,
            )
            .await;
            report(&notifications, &task, outcome);
            outcome
        });

        Self {
            task,
            cancel: Some(cancel_tx),
            join,
        }
    }

    /// Whether the poller is still running
    pub fn is_active(&self) -> bool {
        !self.join.is_finished()
    }

    /// Ask the poller to stop. No-op if it already stopped.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    /// Wait for the poller to stop
    pub async fn wait(self) -> PollOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Status poller for {} aborted: {}", self.task, e);
                PollOutcome::Cancelled
            }
        }
    }
}

fn report(notifications: &NotificationQueue, task: &TaskRef, outcome: PollOutcome) {
    match outcome {
        PollOutcome::Finished(ExecutionStatus::Success) => {
            notifications.push(NotificationKind::Success, format!("{} finished", task));
        }
        PollOutcome::Finished(status) => {
            notifications.push(
                NotificationKind::Error,
                format!("{} finished with status {}", task, status),
            );
        }
        PollOutcome::Stopped(Some(status)) => {
            notifications.push(NotificationKind::Warning, format!("{} is {}", task, status));
        }
        PollOutcome::Stopped(None) => {
            notifications.push(
                NotificationKind::Warning,
                format!("{} reported an unknown status, check its logs", task),
            );
        }
        PollOutcome::TimedOut { .. } => {
            notifications.push(
                NotificationKind::Warning,
                format!("{} is still running, check its logs later", task),
            );
        }
        PollOutcome::Cancelled => {}
    }
}
