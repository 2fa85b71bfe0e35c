//! Viewport size computation

use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;

/// Terminal viewport in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub cols: u16,
    pub rows: u16,
}

/// Computes the current viewport size
pub trait ViewportProbe: Send + Sync {
    fn size(&self) -> Result<ViewportSize, ConsoleError>;
}

/// Size of the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TtyViewport;

impl ViewportProbe for TtyViewport {
    fn size(&self) -> Result<ViewportSize, ConsoleError> {
        let (cols, rows) = crossterm::terminal::size()?;
        if cols == 0 || rows == 0 {
            return Err(ConsoleError::ChannelError(format!(
                "Viewport has no area ({}x{})",
                cols, rows
            )));
        }
        Ok(ViewportSize { cols, rows })
    }
}
