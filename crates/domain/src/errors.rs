//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// A line code could not be interpreted
    #[error("Invalid line code: {0}")]
    InvalidLineCode(String),

    /// A stop code could not be interpreted
    #[error("Invalid stop code: {0}")]
    InvalidStopCode(String),
}
