//! Interactive terminal sessions to remote hosts.
//!
//! A [`bridge::TerminalView`] owns one render surface and one duplex
//! channel. Server messages are applied to the surface in arrival order;
//! keystrokes and viewport changes go out as they happen.

pub mod bridge;
pub mod channel;
pub mod keys;
pub mod protocol;
pub mod surface;
pub mod viewport;
