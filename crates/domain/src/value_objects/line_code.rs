//! Canonical line code value object

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// The opaque numeric identifier the upstream API assigns to a line variant
/// (`cl` in the Olho Vivo payloads)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineCode(i64);

impl LineCode {
    /// Wrap a raw upstream code
    pub const fn new(code: i64) -> Self {
        Self(code)
    }

    /// Get the raw numeric value
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LineCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| DomainError::InvalidLineCode(s.to_string()))
    }
}

impl From<i64> for LineCode {
    fn from(code: i64) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_code() {
        let code: LineCode = " 1273 ".parse().unwrap();
        assert_eq!(code.value(), 1273);
    }

    #[test]
    fn rejects_textual_code() {
        assert!("701U".parse::<LineCode>().is_err());
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&LineCode::new(33887)).unwrap();
        assert_eq!(json, "33887");
    }
}
