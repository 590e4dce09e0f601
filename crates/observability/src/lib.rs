//! Tracing, logging and trace-context propagation (shared setup).

pub mod config;
pub mod propagation;
pub mod subscriber;

pub use config::{TelemetryConfig, TelemetryProviders};
pub use propagation::TracePropagator;
pub use subscriber::{init, shutdown};
