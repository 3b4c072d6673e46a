//! Canonical stop code value object

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// The identifier the upstream API uses for a stop (`cp`)
///
/// Numeric-looking, but kept as text: the resolver passes literal user input
/// through unchanged and never does arithmetic on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopCode(String);

impl StopCode {
    /// Create a stop code, rejecting blank input
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidStopCode(code));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Whether the input is a literal numeric stop code
    pub fn is_literal(input: &str) -> bool {
        let trimmed = input.trim();
        !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
    }

    /// Borrow the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StopCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_input() {
        let code = StopCode::new("  340015345 ").unwrap();
        assert_eq!(code.as_str(), "340015345");
    }

    #[test]
    fn rejects_blank() {
        assert!(StopCode::new("   ").is_err());
    }

    #[test]
    fn literal_detection() {
        assert!(StopCode::is_literal("340015345"));
        assert!(StopCode::is_literal(" 42 "));
        assert!(!StopCode::is_literal("Av Paulista"));
        assert!(!StopCode::is_literal("12a"));
        assert!(!StopCode::is_literal(""));
        assert!(!StopCode::is_literal("-12"));
    }
}
