//! Estimate Forge API Server module
//!
//! HTTP REST API over the template populator.
//! Run with `estimate-forge-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, ApiConfig};
