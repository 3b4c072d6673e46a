//! Line resolution
//!
//! Maps user text such as "701u-10", "701U 10" or "477P" to exactly one
//! canonical line code. Resolution never retries and never reports
//! ambiguity: the most precise matching tier wins and, failing that, the
//! first upstream result is taken.

use std::sync::Arc;

use domain::{LineCandidate, MatchTier, Resolution};
use tracing::{debug, instrument};

use crate::error::ApplicationError;
use crate::ports::TransitPort;

/// Normalized line reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineQuery {
    /// Route sign, e.g. "701U"
    pub primary: String,
    /// Variant suffix, e.g. "10"
    pub variant: Option<String>,
}

impl LineQuery {
    /// Normalize user text
    ///
    /// Uppercases and trims, then splits at the first `-`, `_` or run of
    /// whitespace. Returns `None` when no primary code remains.
    pub fn parse(input: &str) -> Option<Self> {
        let upper = input.trim().to_uppercase();
        let (primary, variant) = match upper.find(|c: char| c == '-' || c == '_' || c.is_whitespace()) {
            Some(idx) => {
                let (head, tail) = upper.split_at(idx);
                let tail = tail.trim_start_matches(|c: char| c == '-' || c == '_' || c.is_whitespace());
                (head.to_string(), strip_whitespace(tail))
            },
            None => (upper.clone(), String::new()),
        };

        let primary = strip_whitespace(&primary);
        if primary.is_empty() {
            return None;
        }

        Some(Self {
            primary,
            variant: (!variant.is_empty()).then_some(variant),
        })
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Pick one candidate for a query
///
/// Tiers, first non-empty wins: sign and variant equal (only when a variant
/// was given), sign equal, first candidate.
pub fn select_line(candidates: Vec<LineCandidate>, query: &LineQuery) -> Resolution<LineCandidate> {
    let same_sign =
        |c: &LineCandidate| strip_whitespace(&c.headsign).eq_ignore_ascii_case(&query.primary);

    if let Some(variant) = &query.variant {
        if let Some(found) = candidates
            .iter()
            .find(|c| same_sign(*c) && strip_whitespace(&c.variant).eq_ignore_ascii_case(variant))
        {
            return Resolution::resolved(found.clone(), MatchTier::ExactVariant);
        }
    }

    if let Some(found) = candidates.iter().find(|c| same_sign(*c)) {
        return Resolution::resolved(found.clone(), MatchTier::PrimaryCode);
    }

    candidates
        .into_iter()
        .next()
        .map_or(Resolution::NotFound, |first| {
            Resolution::resolved(first, MatchTier::FirstResult)
        })
}

/// Resolves line references through the transit API's line search
#[derive(Clone)]
pub struct LineResolver {
    transit: Arc<dyn TransitPort>,
}

impl std::fmt::Debug for LineResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineResolver").finish_non_exhaustive()
    }
}

impl LineResolver {
    /// Create a resolver
    pub fn new(transit: Arc<dyn TransitPort>) -> Self {
        Self { transit }
    }

    /// Resolve user text to one line
    ///
    /// Blank input resolves to `NotFound` without contacting the upstream.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures of the line search.
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Result<Resolution<LineCandidate>, ApplicationError> {
        let Some(query) = LineQuery::parse(input) else {
            debug!("Blank line reference");
            return Ok(Resolution::NotFound);
        };

        let candidates = self.transit.search_lines(&query.primary).await?;
        let resolution = select_line(candidates, &query);

        debug!(
            primary = %query.primary,
            variant = ?query.variant,
            tier = ?resolution.tier(),
            code = ?resolution.candidate().map(|c| c.code),
            "Line resolved"
        );
        Ok(resolution)
    }
}
