//! Classified intents - Strongly typed representations of user requests

use serde::{Deserialize, Serialize};

/// Every request kind the query engine understands
///
/// Produced by the classifier (or an explicit API call) and consumed by the
/// intent router. The set is closed: adding a variant forces every dispatcher
/// to handle it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// List every line matching a free-text term
    LineSearch {
        /// Term as typed by the user
        term: String,
    },

    /// Vehicle positions for one line
    Position {
        /// Line reference as typed (e.g. "477P", "701U-10")
        line: String,
    },

    /// Arrival predictions at a stop, optionally for one line only
    Prediction {
        /// Stop reference: literal code or free-text place
        stop: String,
        /// Optional line reference
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<String>,
    },

    /// Public transport route between two places
    Route {
        /// Origin address or place
        origin: String,
        /// Destination address or place
        destination: String,
    },

    /// Usage help
    Help,

    /// Anything the classifier could not map
    Unknown,
}

impl Intent {
    /// Short stable name, used as a span field
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LineSearch { .. } => "line_search",
            Self::Position { .. } => "position",
            Self::Prediction { .. } => "prediction",
            Self::Route { .. } => "route",
            Self::Help => "help",
            Self::Unknown => "unknown",
        }
    }
}
