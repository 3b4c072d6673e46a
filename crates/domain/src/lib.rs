//! Domain layer for MobilizaSP
//!
//! Contains the transit vocabulary shared by every other crate: line and stop
//! candidates, canonical codes, classified intents, resolution results and
//! query outcomes. This layer performs no I/O.

pub mod entities;
pub mod errors;
pub mod intent;
pub mod outcome;
pub mod resolution;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use intent::Intent;
pub use outcome::{QueryOutcome, QueryPayload, UpstreamFailureKind};
pub use resolution::{MatchTier, Resolution};
pub use value_objects::*;
