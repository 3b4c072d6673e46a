//! Line candidate returned by a line search

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value_objects::LineCode;

/// Direction of travel of a line variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDirection {
    /// From the primary terminal to the secondary terminal
    MainToSecondary,
    /// From the secondary terminal back to the primary terminal
    SecondaryToMain,
}

impl LineDirection {
    /// Map the upstream `sl` field (1 or 2)
    pub const fn from_upstream(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::MainToSecondary),
            2 => Some(Self::SecondaryToMain),
            _ => None,
        }
    }
}

/// One line variant as reported by the upstream line search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCandidate {
    /// Canonical code required by position and prediction queries
    pub code: LineCode,
    /// Route sign shown on the vehicle (e.g. "701U")
    pub headsign: String,
    /// Variant suffix (e.g. "10"); empty when the upstream has none
    pub variant: String,
    /// Description of the primary terminal
    pub origin_description: String,
    /// Description of the secondary terminal
    pub destination_description: String,
    /// Whether the line runs a circular route
    pub circular: bool,
    /// Direction of travel, when the upstream reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<LineDirection>,
}

impl LineCandidate {
    /// Display label in the usual `SIGN-VARIANT` form
    pub fn label(&self) -> String {
        if self.variant.is_empty() {
            self.headsign.clone()
        } else {
            format!("{}-{}", self.headsign, self.variant)
        }
    }
}

impl fmt::Display for LineCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} → {}",
            self.label(),
            self.origin_description,
            self.destination_description
        )
    }
}
