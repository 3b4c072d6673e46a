//! Stop candidate returned by a stop search

use serde::{Deserialize, Serialize};

use crate::value_objects::{LineCode, StopCode};

/// One stop as reported by the upstream stop search
///
/// A candidate built from a literal numeric code carries only the code; the
/// descriptive fields stay empty because no search was performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopCandidate {
    /// Canonical code required by prediction queries
    pub code: StopCode,
    /// Stop name
    pub name: String,
    /// Street address
    pub address: String,
    /// Neighborhood, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    /// Street name, when reported separately from the address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Latitude in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Lines known to serve this stop, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_lines: Option<Vec<LineCode>>,
}

impl StopCandidate {
    /// Candidate for a literal stop code typed by the user
    pub fn literal(code: StopCode) -> Self {
        Self {
            code,
            name: String::new(),
            address: String::new(),
            neighborhood: None,
            street: None,
            latitude: None,
            longitude: None,
            destination_lines: None,
        }
    }

    /// Free-text fields searched when ranking candidates
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.name.as_str()),
            Some(self.address.as_str()),
            self.neighborhood.as_deref(),
            self.street.as_deref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Label for presentation: the name if known, the code otherwise
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.code.to_string()
        } else {
            format!("{} ({})", self.name, self.code)
        }
    }
}
