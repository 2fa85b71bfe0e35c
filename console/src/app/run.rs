//! Main application run loop

use std::future::Future;

use colored::Colorize;
use crossterm::event::{Event, EventStream};
use crossterm::terminal;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::app::options::{AppOptions, Command};
use crate::app::state::AppState;
use crate::errors::ConsoleError;
use crate::exec::controller::TriggerOutcome;
use crate::exec::poller::PollOutcome;
use crate::models::{CanaryResult, CanaryStatus, ExecutionStatus, HostId, TaskKind, TaskRef};
use crate::notify::{now_ms, Notification, NotificationKind, NotificationQueue};
use crate::sessions::naming::format_session_name;
use crate::terminal::bridge::{ChannelState, TerminalView};
use crate::terminal::keys::{encode_key, is_detach};
use crate::terminal::surface::StdoutSurface;
use crate::terminal::viewport::{TtyViewport, ViewportProbe};

/// Run one console command
pub async fn run(
    command: Command,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ConsoleError> {
    info!("Initializing runme console...");
    let state = AppState::init(&options)?;

    // The terminal reads Ctrl-C as input, so it never races the signal
    if let Command::Terminal(host_id) = command {
        return run_terminal(&state, host_id).await;
    }

    let result = tokio::select! {
        result = dispatch(&state, command) => result,
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
            for task in state.running.running() {
                state.controller.cancel_polling(&task);
            }
            Ok(())
        }
    };

    print_notifications(&state.notifications);
    result
}

async fn dispatch(state: &AppState, command: Command) -> Result<(), ConsoleError> {
    match command {
        Command::Tasks(kind) => list_tasks(state, kind).await,
        Command::Execute {
            task,
            target_host,
            docker_command,
        } => execute(state, task, target_host, docker_command).await,
        Command::Canary(task) => canary(state, task).await,
        Command::Sessions(task) => list_sessions(state, task).await,
        Command::Logs {
            task,
            session_name,
            host,
        } => show_logs(state, task, &session_name, host.as_deref()).await,
        Command::Terminal(host_id) => run_terminal(state, host_id).await,
    }
}

// ================================= TASKS ========================================= //

async fn list_tasks(state: &AppState, kind: TaskKind) -> Result<(), ConsoleError> {
    let tasks = state.tasks.list_tasks(kind).await?;
    if tasks.is_empty() {
        println!("No {} tasks", kind);
        return Ok(());
    }

    for task in tasks {
        let group = match task.host_group_id {
            Some(id) => format!("group {}", id),
            None => "no group".dimmed().to_string(),
        };
        println!("{:>6}  {}  ({})", task.id, task.name.bold(), group);
    }
    Ok(())
}

// =============================== EXECUTION ======================================= //

async fn execute(
    state: &AppState,
    task_ref: TaskRef,
    target_host: Option<HostId>,
    docker_command: Option<String>,
) -> Result<(), ConsoleError> {
    let mut task = state.tasks.get_task(task_ref.kind, task_ref.id).await?;
    if target_host.is_some() {
        task.target_host_id = target_host;
    }
    if let Some(command) = docker_command {
        task.payload = command;
    }

    let outcome = state.controller.trigger(&task).await;
    print_notifications(&state.notifications);

    match outcome? {
        TriggerOutcome::Rejected => {
            println!("{} is already running", task_ref);
        }
        TriggerOutcome::Completed(status) => {
            println!("{} {}", task_ref, status_label(status));
        }
        TriggerOutcome::Polling { session_name } => {
            match session_name {
                Some(name) => println!(
                    "{} running as {}",
                    task_ref,
                    format_session_name(&name, task_ref.kind).cyan()
                ),
                None => println!("{} running", task_ref),
            }

            match state.controller.wait_for(&task_ref).await {
                Some(PollOutcome::Finished(status)) => {
                    println!("{} {}", task_ref, status_label(status));
                }
                Some(PollOutcome::Stopped(status)) => {
                    print_notifications(&state.notifications);
                    match status {
                        Some(status) => println!("{} {}", task_ref, status_label(status)),
                        None => println!("{} status unknown", task_ref),
                    }
                }
                Some(PollOutcome::TimedOut { attempts }) => {
                    print_notifications(&state.notifications);
                    return Err(ConsoleError::PollingTimeout {
                        task: task_ref,
                        attempts,
                    });
                }
                Some(PollOutcome::Cancelled) | None => {}
            }
        }
    }
    Ok(())
}

fn status_label(status: ExecutionStatus) -> colored::ColoredString {
    match status {
        ExecutionStatus::Success => status.as_str().green(),
        ExecutionStatus::Failed => status.as_str().red(),
        ExecutionStatus::Pending | ExecutionStatus::Running => status.as_str().yellow(),
    }
}

// ================================= CANARY ======================================== //

async fn canary(state: &AppState, task: TaskRef) -> Result<(), ConsoleError> {
    let outcome = state.canary.trigger_canary(&task).await;
    print_notifications(&state.notifications);

    let Some(result) = outcome? else {
        println!("{} is already running", task);
        return Ok(());
    };
    print_canary(&result);

    if !result.offers_continuation() {
        state.canary.dismiss(&task);
        return Ok(());
    }

    let question = format!(
        "Continue on the {} remaining hosts? [y/N] ",
        result.remaining_hosts.len()
    );
    if confirm(&question).await? {
        let continued = state.canary.continue_rollout(&task).await;
        print_notifications(&state.notifications);
        continued?;
    } else {
        state.canary.dismiss(&task);
        println!("Rollout stopped after {}", result.experimental_host);
    }
    Ok(())
}

fn print_canary(result: &CanaryResult) {
    let verdict = match result.status {
        CanaryStatus::ExperimentalSuccess => "succeeded".green(),
        CanaryStatus::ExperimentalFailure => "failed".red(),
    };
    println!(
        "Canary on {} {} (session {})",
        result.experimental_host.bold(),
        verdict,
        format_session_name(&result.session_name, result.task.kind)
    );

    let record = &result.experimental_record;
    if !record.output.is_empty() {
        println!("{}", record.output);
    }
    if !record.error.is_empty() {
        println!("{}", record.error.red());
    }

    for host in &result.remaining_hosts {
        println!("  pending: {}", host.address());
    }
}

async fn confirm(question: &str) -> Result<bool, ConsoleError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

// ================================ SESSIONS ======================================= //

async fn list_sessions(state: &AppState, task: TaskRef) -> Result<(), ConsoleError> {
    let sessions = state.sessions.list_sessions(&task).await?;
    if sessions.is_empty() {
        println!("No sessions for {}", task);
        return Ok(());
    }

    for session in sessions {
        println!(
            "{}  {}",
            format_session_name(&session.session_name, task.kind).bold(),
            session.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
        );
    }
    Ok(())
}

async fn show_logs(
    state: &AppState,
    task: TaskRef,
    session_name: &str,
    host: Option<&str>,
) -> Result<(), ConsoleError> {
    let mut logs = state.sessions.select_session(&task, session_name).await?;
    if let Some(host) = host {
        if !logs.select_host(host) {
            return Err(ConsoleError::NotFound(format!(
                "Host {} in session {}",
                host, session_name
            )));
        }
    }

    println!("Session {}", logs.display_name().bold());
    println!("Hosts: {}", logs.host_names().join(", "));

    let Some(selected) = logs.selected_host() else {
        println!("No logs recorded");
        return Ok(());
    };
    for record in &selected.records {
        println!("{} {}", selected.host.bold(), status_label(record.status));
        if !record.output.is_empty() {
            println!("{}", record.output);
        }
        if !record.error.is_empty() {
            println!("{}", record.error.red());
        }
    }
    Ok(())
}

// ================================ TERMINAL ======================================= //

async fn run_terminal(state: &AppState, host_id: HostId) -> Result<(), ConsoleError> {
    let mut view = TerminalView::new(
        host_id,
        Box::new(StdoutSurface::new()),
        state.terminal_options.clone(),
    );
    view.open(state.connector.as_ref()).await?;

    eprintln!("Connected to host {}. Press Ctrl-] to detach.\r", host_id);
    terminal::enable_raw_mode()?;
    let result = terminal_loop(&mut view, &TtyViewport).await;
    if let Err(e) = terminal::disable_raw_mode() {
        error!("Failed to restore the terminal: {}", e);
    }

    view.teardown();
    println!();
    result
}

async fn terminal_loop(
    view: &mut TerminalView,
    probe: &dyn ViewportProbe,
) -> Result<(), ConsoleError> {
    view.fit(probe).await;
    let mut input = EventStream::new();

    loop {
        tokio::select! {
            event = view.next_event() => match event {
                Some(event) => view.handle_event(event)?,
                None => {
                    info!("Terminal channel to host {} ended", view.host_id());
                    break;
                }
            },
            event = input.next() => match event {
                Some(Ok(Event::Key(key))) => {
                    if is_detach(&key) {
                        info!("Detaching from host {}", view.host_id());
                        break;
                    }
                    if let Some(data) = encode_key(&key) {
                        view.send_input(&data)?;
                    }
                }
                Some(Ok(Event::Paste(text))) => {
                    view.send_input(&text)?;
                }
                Some(Ok(Event::Resize(_, _))) => view.fit(probe).await,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Keyboard input failed: {}", e);
                    return Err(e.into());
                }
                None => break,
            },
        }
    }

    if view.state() == ChannelState::Errored {
        warn!("Terminal channel to host {} ended with an error", view.host_id());
    }
    Ok(())
}

// ============================== NOTIFICATIONS ==================================== //

fn print_notifications(queue: &NotificationQueue) {
    for notification in take_live(queue, now_ms()) {
        println!("{}", render_notification(&notification));
    }
}

/// Everything still on screen at `now_ms`. Expired entries are dropped.
fn take_live(queue: &NotificationQueue, now_ms: u64) -> Vec<Notification> {
    let expired = queue.prune(now_ms);
    if !expired.is_empty() {
        debug!("Dropped {} expired notifications", expired.len());
    }
    queue.drain()
}

fn render_notification(notification: &Notification) -> String {
    let title = match notification.kind {
        NotificationKind::Success => notification.title.green(),
        NotificationKind::Error => notification.title.red(),
        NotificationKind::Warning => notification.title.yellow(),
        NotificationKind::Info => notification.title.blue(),
    };
    format!("[{}] {}", title.bold(), notification.message)
}
