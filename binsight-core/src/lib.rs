//! Core types and service wiring for the binsight waste classification relay.

/// Domain models shared by all adapters.
pub mod model;
/// Bounded polling of asynchronous recognition jobs.
pub mod poll;
/// Traits describing the adapter interfaces.
pub mod ports;
/// High-level service orchestrating recognition, classification and storage.
pub mod service;

pub use model::*;
pub use poll::*;
pub use ports::*;
pub use service::*;
