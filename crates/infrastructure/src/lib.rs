//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer and owns process-wide
//! concerns: layered configuration and the tracing subscriber.

pub mod adapters;
pub mod config;
pub mod telemetry;

pub use adapters::*;
pub use config::{AppConfig, ClassifierAppConfig, MapsAppConfig, ServerConfig};
pub use telemetry::{TelemetryConfig, TelemetryError, init_telemetry};
