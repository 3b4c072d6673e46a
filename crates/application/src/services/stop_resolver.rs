//! Stop resolution
//!
//! A reference made only of digits is taken as a stop code as-is. Anything
//! else is searched upstream and the candidates are ranked by how many query
//! tokens appear in their descriptive fields, after folding case and
//! diacritics on both sides.

use std::cmp::Reverse;
use std::sync::Arc;

use domain::{MatchTier, Resolution, StopCandidate, StopCode};
use tracing::{debug, instrument};

use crate::error::ApplicationError;
use crate::normalize::{match_tokens, normalize_for_match};
use crate::ports::TransitPort;

/// Number of query tokens found in the candidate's searchable fields
pub fn score_stop(tokens: &[String], candidate: &StopCandidate) -> usize {
    let haystack = candidate
        .searchable_fields()
        .map(normalize_for_match)
        .collect::<Vec<_>>()
        .join(" ");

    tokens
        .iter()
        .filter(|token| haystack.contains(token.as_str()))
        .count()
}

/// Order candidates by descending score; ties keep upstream order
pub fn rank_stops(query: &str, candidates: Vec<StopCandidate>) -> Vec<(usize, StopCandidate)> {
    let tokens = match_tokens(query);
    let mut scored: Vec<(usize, StopCandidate)> = candidates
        .into_iter()
        .map(|candidate| (score_stop(&tokens, &candidate), candidate))
        .collect();

    scored.sort_by_key(|(score, _)| Reverse(*score));
    scored
}

/// Resolves stop references through the transit API's stop search
#[derive(Clone)]
pub struct StopResolver {
    transit: Arc<dyn TransitPort>,
}

impl std::fmt::Debug for StopResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopResolver").finish_non_exhaustive()
    }
}

impl StopResolver {
    /// Create a resolver
    pub fn new(transit: Arc<dyn TransitPort>) -> Self {
        Self { transit }
    }

    /// Resolve user text to one stop
    ///
    /// # Errors
    ///
    /// Propagates upstream failures of the stop search.
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Result<Resolution<StopCandidate>, ApplicationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            debug!("Blank stop reference");
            return Ok(Resolution::NotFound);
        }

        if StopCode::is_literal(trimmed) {
            let code = StopCode::new(trimmed)?;
            debug!(%code, "Literal stop code");
            return Ok(Resolution::resolved(
                StopCandidate::literal(code),
                MatchTier::LiteralCode,
            ));
        }

        let candidates = self.transit.search_stops(trimmed).await?;
        let count = candidates.len();

        let Some((score, best)) = rank_stops(trimmed, candidates).into_iter().next() else {
            debug!("No stop matched");
            return Ok(Resolution::NotFound);
        };

        debug!(code = %best.code, score, candidates = count, "Stop resolved");
        Ok(Resolution::resolved(best, MatchTier::BestScore))
    }
}
