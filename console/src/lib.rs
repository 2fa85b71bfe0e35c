//! Runme Console Library
//!
//! Core modules for the runme operations console: task execution with
//! status polling, canary rollouts, session log browsing and interactive
//! host terminals.

pub mod app;
pub mod canary;
pub mod errors;
pub mod exec;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod notify;
pub mod registry;
pub mod sessions;
pub mod storage;
pub mod terminal;
pub mod utils;
