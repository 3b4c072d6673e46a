//! Logging and tracing initialization
//!
//! Installs a `tracing-subscriber` registry with an env filter and either a
//! human-readable or a JSON formatting layer.

mod subscriber;

pub use subscriber::{TelemetryConfig, TelemetryError, init_telemetry};
