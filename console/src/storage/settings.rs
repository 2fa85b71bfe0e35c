//! Settings file management

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::errors::ConsoleError;
use crate::exec::poller;
use crate::logs::LogLevel;
use crate::notify;
use crate::terminal::bridge;
use crate::terminal::protocol::ResizeEncoding;

/// Console settings
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily log files under the config directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Status poller configuration
    #[serde(default)]
    pub poller: PollerSettings,

    /// Notification queue configuration
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Terminal configuration
    #[serde(default)]
    pub terminal: TerminalSettings,
}

impl Settings {
    /// Check values that would only fail later, at first use
    pub fn validate(&self) -> Result<(), ConsoleError> {
        let base_url = Url::parse(&self.backend.base_url)
            .map_err(|e| ConsoleError::ConfigError(format!("backend.base_url: {}", e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConsoleError::ConfigError(format!(
                "backend.base_url must be http or https, got {}",
                base_url.scheme()
            )));
        }
        if let Some(ws_base_url) = &self.terminal.ws_base_url {
            let url = Url::parse(ws_base_url)
                .map_err(|e| ConsoleError::ConfigError(format!("terminal.ws_base_url: {}", e)))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(ConsoleError::ConfigError(format!(
                    "terminal.ws_base_url must be ws or wss, got {}",
                    url.scheme()
                )));
            }
        }
        if self.poller.max_attempts == 0 {
            return Err(ConsoleError::ConfigError(
                "poller.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// WebSocket base of the terminal channels
    pub fn ws_base_url(&self) -> Result<String, ConsoleError> {
        if let Some(url) = &self.terminal.ws_base_url {
            return Ok(url.clone());
        }

        let mut url = Url::parse(&self.backend.base_url)?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(ConsoleError::ConfigError(format!(
                    "Invalid backend URL scheme: {}",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| ConsoleError::ConfigError("Failed to set scheme".to_string()))?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    pub fn poller_options(&self) -> poller::Options {
        poller::Options {
            interval: Duration::from_millis(self.poller.interval_ms),
            max_attempts: self.poller.max_attempts,
        }
    }

    pub fn notification_options(&self) -> notify::Options {
        notify::Options {
            capacity: self.notifications.capacity,
            duration_ms: self.notifications.duration_ms,
        }
    }

    pub fn terminal_options(&self) -> bridge::Options {
        bridge::Options {
            resize_encoding: self.terminal.resize_encoding,
            fit_retry_delay: Duration::from_millis(self.terminal.fit_retry_delay_ms),
        }
    }
}

/// Backend API settings
#[derive(Debug, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Bearer token, if the backend requires one
    #[serde(default, skip_serializing, deserialize_with = "deserialize_secret")]
    pub api_token: Option<SecretString>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let token = Option::<String>::deserialize(deserializer)?;
    Ok(token.filter(|t| !t.is_empty()).map(SecretString::from))
}

fn default_backend_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Status poller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    30
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// 0 keeps notifications until dismissed
    #[serde(default = "default_duration")]
    pub duration_ms: u64,
}

fn default_capacity() -> usize {
    20
}

fn default_duration() -> u64 {
    3000
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            duration_ms: default_duration(),
        }
    }
}

/// Terminal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// Derived from the backend URL when absent
    #[serde(default)]
    pub ws_base_url: Option<String>,

    #[serde(default)]
    pub resize_encoding: ResizeEncoding,

    #[serde(default = "default_fit_retry_delay")]
    pub fit_retry_delay_ms: u64,
}

fn default_fit_retry_delay() -> u64 {
    100
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            ws_base_url: None,
            resize_encoding: ResizeEncoding::Object,
            fit_retry_delay_ms: default_fit_retry_delay(),
        }
    }
}
