//! Read-only task and inventory views

pub mod tasks;
