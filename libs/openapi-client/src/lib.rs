//! Wire models for the runme backend API

pub mod models;
