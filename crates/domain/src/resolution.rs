//! Entity resolution results

use serde::{Deserialize, Serialize};

/// Which matching strategy produced a resolved candidate
///
/// Earlier variants are more precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Line sign and variant both matched exactly
    ExactVariant,
    /// Line sign matched, variant ignored
    PrimaryCode,
    /// First upstream result, used as the deterministic last resort
    FirstResult,
    /// Stop code taken literally from the input, no search performed
    LiteralCode,
    /// Stop chosen by token-overlap ranking
    BestScore,
}

/// Outcome of resolving user text to a single canonical entity
///
/// Ambiguity never escapes resolution: either exactly one candidate was
/// chosen, or nothing matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// A single candidate was chosen
    Resolved {
        /// The chosen candidate
        candidate: T,
        /// The strategy that chose it
        tier: MatchTier,
    },
    /// Nothing matched
    NotFound,
}

impl<T> Resolution<T> {
    /// Wrap a resolved candidate
    pub const fn resolved(candidate: T, tier: MatchTier) -> Self {
        Self::Resolved { candidate, tier }
    }

    /// The resolved candidate, if any
    pub fn candidate(&self) -> Option<&T> {
        match self {
            Self::Resolved { candidate, .. } => Some(candidate),
            Self::NotFound => None,
        }
    }

    /// The tier that resolved the candidate, if any
    pub const fn tier(&self) -> Option<MatchTier> {
        match self {
            Self::Resolved { tier, .. } => Some(*tier),
            Self::NotFound => None,
        }
    }

    /// Consume and return the candidate, if any
    pub fn into_candidate(self) -> Option<T> {
        match self {
            Self::Resolved { candidate, .. } => Some(candidate),
            Self::NotFound => None,
        }
    }

    /// Whether nothing matched
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
