//! Two-phase canary rollouts

pub mod coordinator;
