//! Task execution: trigger, run state and status polling

pub mod api;
pub mod controller;
pub mod fsm;
pub mod poller;
pub mod registry;
