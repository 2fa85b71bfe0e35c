//! Backend API client

pub mod client;
pub mod inventory;
pub mod routes;
pub mod tasks;
