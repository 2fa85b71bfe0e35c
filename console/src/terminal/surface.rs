//! Render surfaces for terminal output

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::errors::ConsoleError;

/// Where terminal output is drawn
pub trait RenderSurface: Send {
    /// Append text, escape sequences included
    fn write(&mut self, text: &str) -> Result<(), ConsoleError>;

    /// Release the surface; nothing is written afterwards
    fn dispose(&mut self);
}

/// Banner of a `connected` message
pub fn banner(text: &str) -> String {
    format!("\r\n{}\r\n", text)
}

/// Inline error, red
pub fn error_line(text: &str) -> String {
    format!("\r\n\x1b[31mError: {}\x1b[0m\r\n", text)
}

/// Notice about the channel, yellow
pub fn notice_line(text: &str) -> String {
    format!("\r\n\x1b[33m{}\x1b[0m\r\n", text)
}

/// Writes to the process stdout
#[derive(Debug, Default)]
pub struct StdoutSurface {
    disposed: bool,
}

impl StdoutSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSurface for StdoutSurface {
    fn write(&mut self, text: &str) -> Result<(), ConsoleError> {
        if self.disposed {
            return Ok(());
        }
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn dispose(&mut self) {
        self.disposed = true;
        let _ = std::io::stdout().flush();
    }
}

#[derive(Debug, Default)]
struct BufferState {
    text: String,
    disposals: usize,
}

/// In-memory surface. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferSurface {
    state: Arc<Mutex<BufferState>>,
}

impl BufferSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .text
            .clone()
    }

    /// How many times the surface was released
    pub fn disposals(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).disposals
    }
}

impl RenderSurface for BufferSurface {
    fn write(&mut self, text: &str) -> Result<(), ConsoleError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.disposals == 0 {
            state.text.push_str(text);
        }
        Ok(())
    }

    fn dispose(&mut self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).disposals += 1;
    }
}
