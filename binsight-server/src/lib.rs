//! HTTP relay that classifies pictured items into waste categories.

/// Command line and environment configuration.
pub mod config;
/// Tracing subscriber setup.
pub mod logging;
/// HTTP routes and error responses.
pub mod server;

pub use config::Config;
pub use server::{AppState, router};
