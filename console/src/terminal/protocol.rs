//! Terminal channel wire messages

use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;
use crate::terminal::viewport::ViewportSize;

/// Message pushed by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Banner sent once the remote shell is ready
    Connected(String),

    /// Raw terminal output
    Data(String),

    /// Remote failure, shown inline
    Error(String),
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, ConsoleError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// How resize dimensions are encoded in the `data` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeEncoding {
    /// `{"cols": .., "rows": ..}`
    #[default]
    Object,

    /// The same object serialized into a JSON string
    String,
}

/// Payload of a resize message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResizePayload {
    Size(ViewportSize),
    Encoded(String),
}

/// Message sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// One keystroke or paste event
    Input(String),

    /// New viewport size
    Resize(ResizePayload),
}

impl OutboundMessage {
    pub fn input(data: impl Into<String>) -> Self {
        OutboundMessage::Input(data.into())
    }

    pub fn resize(size: ViewportSize, encoding: ResizeEncoding) -> Result<Self, ConsoleError> {
        let payload = match encoding {
            ResizeEncoding::Object => ResizePayload::Size(size),
            ResizeEncoding::String => ResizePayload::Encoded(serde_json::to_string(&size)?),
        };
        Ok(OutboundMessage::Resize(payload))
    }

    pub fn to_text(&self) -> Result<String, ConsoleError> {
        Ok(serde_json::to_string(self)?)
    }
}
