//! Application layer - Use cases and orchestration
//!
//! Resolves user references to canonical line and stop codes, classifies
//! free text into intents and routes intents to the transit API through
//! the port definitions in [`ports`].

pub mod error;
pub mod normalize;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
