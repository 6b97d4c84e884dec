//! CLI command handlers

pub mod commands;

pub use commands::{export, fill, inspect, summary, template};
