//! Query outcomes returned to callers of the intent router

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{LineCandidate, StopCandidate};

/// Classification of a failed upstream interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamFailureKind {
    /// No credential configured; nothing was sent
    CredentialMissing,
    /// The upstream refused the credential, even after a fresh login
    AuthenticationRejected,
    /// Network failure, timeout, 5xx or rate limiting that outlived retries
    Transient,
    /// The upstream reported that the requested resource does not exist
    NotFound,
    /// Any other client error reported by the upstream
    UpstreamError,
    /// The upstream answered with a payload that could not be decoded
    InvalidResponse,
}

impl UpstreamFailureKind {
    /// Whether the failure stems from configuration rather than the request
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::CredentialMissing | Self::AuthenticationRejected)
    }
}

impl fmt::Display for UpstreamFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CredentialMissing => "credential_missing",
            Self::AuthenticationRejected => "authentication_rejected",
            Self::Transient => "transient",
            Self::NotFound => "not_found",
            Self::UpstreamError => "upstream_error",
            Self::InvalidResponse => "invalid_response",
        };
        f.write_str(s)
    }
}

/// Data returned by a successful query
///
/// Upstream position, prediction and route payloads are passed through
/// unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryPayload {
    /// Every line matching a search term
    Lines {
        /// Term that was searched
        term: String,
        /// Raw candidate set, in upstream order
        lines: Vec<LineCandidate>,
    },
    /// Vehicle positions of a resolved line
    Positions {
        /// The resolved line
        line: LineCandidate,
        /// Upstream position payload
        data: Value,
    },
    /// Arrival predictions at a resolved stop
    Predictions {
        /// The resolved stop
        stop: StopCandidate,
        /// The resolved line, when one was requested
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<LineCandidate>,
        /// Upstream prediction payload
        data: Value,
    },
    /// Stops served by a resolved line
    LineStops {
        /// The resolved line
        line: LineCandidate,
        /// Stops in upstream order
        stops: Vec<StopCandidate>,
    },
    /// Public transport route from the route planner
    Route {
        /// Origin as requested
        origin: String,
        /// Destination as requested
        destination: String,
        /// Route planner payload
        data: Value,
    },
}

/// Final result of dispatching one intent
///
/// Presentation layers map each variant to user-facing text; none of them
/// carries formatted text itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The query produced data
    Success {
        /// Query data
        payload: QueryPayload,
        /// True when the data came from a fallback query rather than the
        /// exact one requested
        degraded: bool,
    },
    /// The line reference matched nothing
    LineNotFound {
        /// Line reference as typed
        line: String,
    },
    /// The stop reference matched nothing
    StopNotFound {
        /// Stop reference as typed
        stop: String,
    },
    /// The stop resolved but the requested line did not
    LineNotFoundForStop {
        /// Line reference as typed
        line: String,
        /// The stop that did resolve
        stop: StopCandidate,
    },
    /// The capability needed for this intent is not configured
    FeatureDisabled {
        /// Name of the missing capability
        feature: String,
    },
    /// The upstream call failed terminally
    UpstreamFailure {
        /// Failure classification
        kind: UpstreamFailureKind,
        /// Diagnostic message
        message: String,
    },
    /// Static usage help
    Help,
    /// The request could not be understood
    Unrecognized,
}

impl QueryOutcome {
    /// Successful, non-degraded outcome
    pub const fn success(payload: QueryPayload) -> Self {
        Self::Success {
            payload,
            degraded: false,
        }
    }

    /// Successful outcome produced by a fallback query
    pub const fn degraded(payload: QueryPayload) -> Self {
        Self::Success {
            payload,
            degraded: true,
        }
    }

    /// Whether the outcome carries data
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether the outcome was produced by a fallback query
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Success { degraded: true, .. })
    }
}
