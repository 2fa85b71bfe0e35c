//! Execution sessions and their per-host logs

pub mod browser;
pub mod naming;
