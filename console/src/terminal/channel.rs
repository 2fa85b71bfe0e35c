//! Duplex terminal channel transport

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use http::header::{HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::ConsoleError;
use crate::http::routes::Routes;
use crate::models::HostId;

/// Frame queued for the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// Transport event delivered to the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Transport established
    Opened,

    /// Text frame from the server
    Message(String),

    /// Transport closed, by either side
    Closed(Option<String>),

    /// Transport failed
    Failed(String),
}

/// Both ends of one open channel
pub struct ChannelLink {
    pub id: Uuid,
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Opens terminal channels to hosts
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Start connecting. Returns while the transport is still connecting;
    /// `ChannelEvent::Opened` follows once it is up.
    async fn open(&self, host_id: HostId) -> Result<ChannelLink, ConsoleError>;
}

/// Build the WebSocket URL of a host's terminal
pub fn build_terminal_url(ws_base_url: &str, host_id: HostId) -> Result<Url, ConsoleError> {
    let mut url = Url::parse(ws_base_url)?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(ConsoleError::ConfigError(format!(
                "Invalid terminal URL scheme: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ConsoleError::ConfigError("Failed to set scheme".to_string()))?;

    url.set_path(&format!(
        "{}{}",
        url.path().trim_end_matches('/'),
        Routes::terminal(host_id)
    ));
    Ok(url)
}

/// Upgrade request for a terminal URL, carrying the API token if there is one
pub fn build_terminal_request(
    url: &Url,
    api_token: Option<&SecretString>,
) -> Result<Request, ConsoleError> {
    let mut request = url.as_str().into_client_request()?;
    if let Some(token) = api_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| ConsoleError::ConfigError("API token is not a valid header".to_string()))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

/// WebSocket transport
pub struct WsConnector {
    ws_base_url: String,
    api_token: Option<SecretString>,
}

impl WsConnector {
    pub fn new(ws_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
            api_token: None,
        }
    }

    /// Authenticate every upgrade request with the API token
    pub fn with_token(ws_base_url: impl Into<String>, api_token: SecretString) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
            api_token: Some(api_token),
        }
    }
}

#[async_trait]
impl ChannelConnector for WsConnector {
    async fn open(&self, host_id: HostId) -> Result<ChannelLink, ConsoleError> {
        let url = build_terminal_url(&self.ws_base_url, host_id)?;
        let request = build_terminal_request(&url, self.api_token.as_ref())?;
        let id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        info!("Terminal channel {} connecting to {}", id, url);
        tokio::spawn(run_channel(id, request, outbound_rx, events_tx));

        Ok(ChannelLink {
            id,
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

async fn run_channel(
    id: Uuid,
    request: Request,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let mut ws_stream = match connect_async(request).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            error!("Terminal channel {} failed to connect: {}", id, e);
            let _ = events.send(ChannelEvent::Failed(e.to_string()));
            return;
        }
    };
    info!("Terminal channel {} open", id);
    if events.send(ChannelEvent::Opened).is_err() {
        let _ = ws_stream.close(None).await;
        return;
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(OutboundFrame::Text(text)) => {
                        if let Err(e) = ws_stream.send(Message::Text(text.into())).await {
                            warn!("Terminal channel {} send failed: {}", id, e);
                            let _ = events.send(ChannelEvent::Failed(e.to_string()));
                            return;
                        }
                    }
                    // Closed locally or the view is gone
                    Some(OutboundFrame::Close) | None => {
                        info!("Terminal channel {} closing", id);
                        let _ = ws_stream.close(None).await;
                        let _ = events.send(ChannelEvent::Closed(None));
                        return;
                    }
                }
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if events.send(ChannelEvent::Message(text.as_str().to_string())).is_err() {
                            let _ = ws_stream.close(None).await;
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty());
                        info!("Terminal channel {} closed by server", id);
                        let _ = events.send(ChannelEvent::Closed(reason));
                        return;
                    }
                    Some(Ok(other)) => {
                        debug!("Terminal channel {} ignoring frame: {:?}", id, other);
                    }
                    Some(Err(e)) => {
                        error!("Terminal channel {} error: {}", id, e);
                        let _ = events.send(ChannelEvent::Failed(e.to_string()));
                        return;
                    }
                    None => {
                        let _ = events.send(ChannelEvent::Closed(None));
                        return;
                    }
                }
            }
        }
    }
}
