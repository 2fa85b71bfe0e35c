//! Application configuration options

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;

use crate::errors::ConsoleError;
use crate::exec::poller;
use crate::logs::LogLevel;
use crate::models::{HostId, TaskKind, TaskRef};
use crate::notify;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::terminal::bridge;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Bearer token for the backend
    pub api_token: Option<SecretString>,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// WebSocket base of the terminal channels
    pub ws_base_url: String,

    /// Status poller options
    pub poller: poller::Options,

    /// Notification queue options
    pub notifications: notify::Options,

    /// Terminal view options
    pub terminal: bridge::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8080/api".to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(30),
            ws_base_url: "ws://localhost:8080/api".to_string(),
            poller: poller::Options::default(),
            notifications: notify::Options::default(),
            terminal: bridge::Options::default(),
        }
    }
}

impl AppOptions {
    /// Build options from the settings file, after applying CLI overrides
    pub fn from_settings(settings: Settings) -> Result<Self, ConsoleError> {
        settings.validate()?;

        Ok(Self {
            ws_base_url: settings.ws_base_url()?,
            request_timeout: settings.backend.request_timeout(),
            poller: settings.poller_options(),
            notifications: settings.notification_options(),
            terminal: settings.terminal_options(),
            backend_base_url: settings.backend.base_url,
            api_token: settings.backend.api_token,
        })
    }
}

/// Apply `--base-url`, `--token` and `--log-level` overrides
pub fn apply_overrides(
    settings: &mut Settings,
    cli_args: &HashMap<String, String>,
) -> Result<(), ConsoleError> {
    if let Some(base_url) = cli_args.get("base-url") {
        settings.backend.base_url = base_url.clone();
    }
    if let Some(token) = cli_args.get("token") {
        settings.backend.api_token = Some(SecretString::from(token.clone()));
    }
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level
            .parse::<LogLevel>()
            .map_err(ConsoleError::ConfigError)?;
    }
    Ok(())
}

/// Storage layout, honoring `--config-dir`
pub fn storage_layout(cli_args: &HashMap<String, String>) -> StorageLayout {
    match cli_args.get("config-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    }
}

/// What the console was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List tasks of one kind
    Tasks(TaskKind),

    /// Trigger a task and follow it to a terminal status
    Execute {
        task: TaskRef,
        target_host: Option<HostId>,
        docker_command: Option<String>,
    },

    /// Run a task on one host first, then offer to continue
    Canary(TaskRef),

    /// List sessions of a task
    Sessions(TaskRef),

    /// Show per-host logs of one session
    Logs {
        task: TaskRef,
        session_name: String,
        host: Option<String>,
    },

    /// Open an interactive terminal to a host
    Terminal(HostId),
}

impl Command {
    /// Parse the command from `--key=value` arguments
    pub fn from_args(cli_args: &HashMap<String, String>) -> Result<Self, ConsoleError> {
        if let Some(kind) = cli_args.get("tasks") {
            return Ok(Command::Tasks(kind.parse()?));
        }
        if let Some(task) = cli_args.get("execute") {
            let target_host = match cli_args.get("target-host") {
                Some(id) => Some(parse_host_id(id)?),
                None => None,
            };
            return Ok(Command::Execute {
                task: task.parse()?,
                target_host,
                docker_command: cli_args.get("command").cloned(),
            });
        }
        if let Some(task) = cli_args.get("canary") {
            return Ok(Command::Canary(task.parse()?));
        }
        if let Some(task) = cli_args.get("sessions") {
            return Ok(Command::Sessions(task.parse()?));
        }
        if let Some(task) = cli_args.get("logs") {
            let session_name = cli_args.get("session").cloned().ok_or_else(|| {
                ConsoleError::ValidationError("--logs needs --session=<name>".to_string())
            })?;
            return Ok(Command::Logs {
                task: task.parse()?,
                session_name,
                host: cli_args.get("host").cloned(),
            });
        }
        if let Some(host_id) = cli_args.get("terminal") {
            return Ok(Command::Terminal(parse_host_id(host_id)?));
        }

        Err(ConsoleError::ValidationError(
            "No command given. Use --tasks, --execute, --canary, --sessions, --logs or --terminal"
                .to_string(),
        ))
    }
}

fn parse_host_id(s: &str) -> Result<HostId, ConsoleError> {
    s.trim()
        .parse()
        .map_err(|_| ConsoleError::ValidationError(format!("Invalid host id: {}", s)))
}
