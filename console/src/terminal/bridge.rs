//! Terminal view: one host, one channel, one render surface

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConsoleError;
use crate::models::HostId;
use crate::terminal::channel::{ChannelConnector, ChannelEvent, ChannelLink, OutboundFrame};
use crate::terminal::protocol::{InboundMessage, OutboundMessage, ResizeEncoding};
use crate::terminal::surface::{self, RenderSurface};
use crate::terminal::viewport::{ViewportProbe, ViewportSize};

/// Terminal view options
#[derive(Debug, Clone)]
pub struct Options {
    pub resize_encoding: ResizeEncoding,

    /// Delay before the single retry of a failed size computation
    pub fit_retry_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            resize_encoding: ResizeEncoding::Object,
            fit_retry_delay: Duration::from_millis(100),
        }
    }
}

/// Channel state of a terminal view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
    Errored,
}

/// Snapshot of a terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSession {
    pub host_id: HostId,
    pub channel_state: ChannelState,
    pub cols: Option<u16>,
    pub rows: Option<u16>,
}

/// Bridges one render surface to one host's terminal channel
pub struct TerminalView {
    host_id: HostId,
    options: Options,
    state: ChannelState,
    surface: Box<dyn RenderSurface>,
    link: Option<ChannelLink>,
    size: Option<ViewportSize>,
    sent_size: Option<ViewportSize>,
    banner_shown: bool,
    opened: bool,
    torn_down: bool,
}

impl TerminalView {
    pub fn new(host_id: HostId, surface: Box<dyn RenderSurface>, options: Options) -> Self {
        Self {
            host_id,
            options,
            state: ChannelState::Connecting,
            surface,
            link: None,
            size: None,
            sent_size: None,
            banner_shown: false,
            opened: false,
            torn_down: false,
        }
    }

    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn session(&self) -> TerminalSession {
        TerminalSession {
            host_id: self.host_id,
            channel_state: self.state,
            cols: self.size.map(|s| s.cols),
            rows: self.size.map(|s| s.rows),
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Open the view's channel. A view owns exactly one channel over its
    /// lifetime; opening again is an error.
    pub async fn open(&mut self, connector: &dyn ChannelConnector) -> Result<(), ConsoleError> {
        if self.torn_down {
            return Err(ConsoleError::ChannelError(format!(
                "Terminal view for host {} is closed",
                self.host_id
            )));
        }
        if self.opened {
            return Err(ConsoleError::ChannelError(format!(
                "Terminal view for host {} already has a channel",
                self.host_id
            )));
        }
        self.opened = true;

        info!("Opening terminal channel to host {}", self.host_id);
        match connector.open(self.host_id).await {
            Ok(link) => {
                debug!("Terminal channel {} connecting", link.id);
                self.link = Some(link);
                Ok(())
            }
            Err(e) => {
                self.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Wait for the next transport event. `None` once the channel is gone.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        match self.link.as_mut() {
            Some(link) => link.events.recv().await,
            None => None,
        }
    }

    /// Apply one transport event
    pub fn handle_event(&mut self, event: ChannelEvent) -> Result<(), ConsoleError> {
        match event {
            ChannelEvent::Opened => {
                if self.state == ChannelState::Connecting {
                    self.set_state(ChannelState::Open);
                    // Layout may have settled before the channel did
                    if let Some(size) = self.size {
                        self.send_resize(size)?;
                    }
                }
                Ok(())
            }
            ChannelEvent::Message(text) => match InboundMessage::parse(&text) {
                Ok(message) => self.handle_message(message),
                Err(e) => {
                    warn!("Ignoring terminal message from host {}: {}", self.host_id, e);
                    Ok(())
                }
            },
            ChannelEvent::Closed(reason) => {
                let text = reason.unwrap_or_else(|| "Connection closed".to_string());
                self.surface.write(&surface::notice_line(&text))?;
                if self.state != ChannelState::Errored {
                    self.set_state(ChannelState::Closed);
                }
                self.link = None;
                Ok(())
            }
            ChannelEvent::Failed(e) => {
                self.fail(&e);
                self.link = None;
                Ok(())
            }
        }
    }

    fn handle_message(&mut self, message: InboundMessage) -> Result<(), ConsoleError> {
        match message {
            InboundMessage::Connected(text) => {
                if self.banner_shown {
                    debug!("Ignoring repeated banner from host {}", self.host_id);
                    return Ok(());
                }
                self.banner_shown = true;
                self.surface.write(&surface::banner(&text))
            }
            InboundMessage::Data(data) => self.surface.write(&data),
            InboundMessage::Error(text) => {
                self.surface.write(&surface::error_line(&text))?;
                // The channel stays up until it is closed explicitly
                self.set_state(ChannelState::Errored);
                Ok(())
            }
        }
    }

    fn fail(&mut self, reason: &str) {
        if let Err(e) = self.surface.write(&surface::error_line(reason)) {
            warn!("Failed to render terminal error: {}", e);
        }
        self.set_state(ChannelState::Errored);
    }

    fn set_state(&mut self, state: ChannelState) {
        if self.state != state {
            info!(
                "Terminal channel to host {}: {:?} -> {:?}",
                self.host_id, self.state, state
            );
            self.state = state;
        }
    }

    fn send(&self, message: &OutboundMessage) -> Result<(), ConsoleError> {
        let link = self.link.as_ref().ok_or_else(|| {
            ConsoleError::ChannelError(format!("No channel to host {}", self.host_id))
        })?;
        link.outbound
            .send(OutboundFrame::Text(message.to_text()?))
            .map_err(|_| ConsoleError::ChannelError("Terminal channel is gone".to_string()))
    }

    /// Forward one input event. Returns false if the channel is not open
    /// and the input was dropped.
    pub fn send_input(&mut self, data: &str) -> Result<bool, ConsoleError> {
        if self.state != ChannelState::Open {
            debug!(
                "Dropping {} bytes of terminal input for host {} while {:?}",
                data.len(),
                self.host_id,
                self.state
            );
            return Ok(false);
        }
        self.send(&OutboundMessage::input(data))?;
        Ok(true)
    }

    /// Record a viewport size, sending it if it changed and the channel is
    /// open. A size recorded while connecting is sent once the channel opens.
    pub fn resize(&mut self, size: ViewportSize) -> Result<(), ConsoleError> {
        self.size = Some(size);
        if self.state == ChannelState::Open {
            self.send_resize(size)?;
        }
        Ok(())
    }

    fn send_resize(&mut self, size: ViewportSize) -> Result<(), ConsoleError> {
        if self.sent_size == Some(size) {
            return Ok(());
        }
        debug!(
            "Resizing terminal of host {} to {}x{}",
            self.host_id, size.cols, size.rows
        );
        self.send(&OutboundMessage::resize(size, self.options.resize_encoding)?)?;
        self.sent_size = Some(size);
        Ok(())
    }

    /// Recompute the viewport size. A failed computation is retried once
    /// after a short delay, then ignored.
    pub async fn fit(&mut self, probe: &dyn ViewportProbe) {
        let size = match probe.size() {
            Ok(size) => size,
            Err(e) => {
                debug!("Viewport size unavailable ({}), retrying", e);
                tokio::time::sleep(self.options.fit_retry_delay).await;
                match probe.size() {
                    Ok(size) => size,
                    Err(e) => {
                        warn!("Terminal fit failed: {}", e);
                        return;
                    }
                }
            }
        };

        if let Err(e) = self.resize(size) {
            warn!("Terminal resize failed: {}", e);
        }
    }

    /// Close the channel and release the surface, whatever the channel
    /// state. Runs once; later calls are no-ops.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(link) = self.link.take() {
            debug!("Closing terminal channel {}", link.id);
            let _ = link.outbound.send(OutboundFrame::Close);
        }
        self.surface.dispose();
        if self.state != ChannelState::Errored {
            self.set_state(ChannelState::Closed);
        }
        info!("Terminal view for host {} torn down", self.host_id);
    }
}

impl Drop for TerminalView {
    fn drop(&mut self) {
        self.teardown();
    }
}
