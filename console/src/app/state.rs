//! Application state management

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::app::options::AppOptions;
use crate::canary::coordinator::CanaryRolloutCoordinator;
use crate::errors::ConsoleError;
use crate::exec::api::ExecutionApi;
use crate::exec::controller::ExecutionController;
use crate::exec::registry::RunningTasks;
use crate::http::client::HttpClient;
use crate::notify::NotificationQueue;
use crate::registry::tasks::TaskRegistry;
use crate::sessions::browser::SessionLogBrowser;
use crate::terminal::bridge;
use crate::terminal::channel::{ChannelConnector, WsConnector};

/// Main application state
pub struct AppState {
    /// HTTP client for backend communication
    pub http_client: Arc<HttpClient>,

    /// Tasks and host groups
    pub tasks: TaskRegistry,

    /// Run state of every task
    pub running: Arc<RunningTasks>,

    /// User-facing notifications
    pub notifications: Arc<NotificationQueue>,

    pub controller: ExecutionController,
    pub canary: CanaryRolloutCoordinator,
    pub sessions: SessionLogBrowser,

    /// Opens terminal channels
    pub connector: Arc<dyn ChannelConnector>,

    pub terminal_options: bridge::Options,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, ConsoleError> {
        info!("Initializing console state for {}", options.backend_base_url);

        let http_client = Arc::new(match &options.api_token {
            Some(token) => HttpClient::with_token(
                &options.backend_base_url,
                options.request_timeout,
                copy_secret(token),
            )?,
            None => HttpClient::new(&options.backend_base_url, options.request_timeout)?,
        });
        let api: Arc<dyn ExecutionApi> = http_client.clone();

        let running = Arc::new(RunningTasks::new());
        let notifications = Arc::new(NotificationQueue::new(options.notifications.clone()));

        let controller = ExecutionController::new(
            api.clone(),
            running.clone(),
            notifications.clone(),
            options.poller.clone(),
        );
        let canary =
            CanaryRolloutCoordinator::new(api.clone(), running.clone(), notifications.clone());
        let sessions = SessionLogBrowser::new(api, notifications.clone());

        Ok(Self {
            tasks: TaskRegistry::new(http_client.clone()),
            http_client,
            running,
            notifications,
            controller,
            canary,
            sessions,
            connector: Arc::new(match &options.api_token {
                Some(token) => {
                    WsConnector::with_token(options.ws_base_url.clone(), copy_secret(token))
                }
                None => WsConnector::new(options.ws_base_url.clone()),
            }),
            terminal_options: options.terminal.clone(),
        })
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
