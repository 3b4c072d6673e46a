//! API error handling
//!
//! Error bodies never carry upstream diagnostics: those can contain URLs of
//! the transit API and are only logged.

use application::ApplicationError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use domain::{QueryOutcome, UpstreamFailureKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A dependency is unreachable or not configured
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A dependency answered with an error or garbage
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// The client exhausted its request budget
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Map an upstream failure to the matching status
    pub fn upstream(kind: UpstreamFailureKind, message: &str) -> Self {
        warn!(%kind, %message, "Upstream failure");
        match kind {
            UpstreamFailureKind::NotFound => Self::NotFound(kind.to_string()),
            UpstreamFailureKind::CredentialMissing
            | UpstreamFailureKind::AuthenticationRejected
            | UpstreamFailureKind::Transient => Self::ServiceUnavailable(kind.to_string()),
            UpstreamFailureKind::UpstreamError | UpstreamFailureKind::InvalidResponse => {
                Self::BadGateway(kind.to_string())
            },
        }
    }

    /// Error for an outcome that carries no payload
    pub fn from_outcome(outcome: &QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::LineNotFound { line } => Self::NotFound(format!("line {line}")),
            QueryOutcome::StopNotFound { stop } => Self::NotFound(format!("stop {stop}")),
            QueryOutcome::LineNotFoundForStop { line, stop } => {
                Self::NotFound(format!("line {line} at stop {}", stop.code))
            },
            QueryOutcome::FeatureDisabled { feature } => {
                Self::ServiceUnavailable(format!("{feature} is not configured"))
            },
            QueryOutcome::UpstreamFailure { kind, message } => Self::upstream(*kind, message),
            QueryOutcome::Success { .. } | QueryOutcome::Help | QueryOutcome::Unrecognized => {
                Self::Internal("outcome has no error".to_string())
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut retry_after = None;
        let (status, code, message, details) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            Self::ServiceUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "Service temporarily unavailable".to_string(),
                Some(detail),
            ),
            Self::BadGateway(detail) => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                "Upstream service error".to_string(),
                Some(detail),
            ),
            Self::RateLimited { retry_after_secs } => {
                retry_after = Some(retry_after_secs);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    "Too many requests".to_string(),
                    None,
                )
            },
            Self::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            },
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::Domain(e) => Self::BadRequest(e.to_string()),
            ApplicationError::Upstream { kind, message } => Self::upstream(kind, &message),
            ApplicationError::Classification(msg) | ApplicationError::ExternalService(msg) => {
                warn!(error = %msg, "External service error");
                Self::BadGateway("external_service".to_string())
            },
            ApplicationError::Configuration(msg) | ApplicationError::Internal(msg) => {
                Self::Internal(msg)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use domain::{StopCandidate, StopCode};

    use super::*;

    #[test]
    fn api_error_messages() {
        assert_eq!(
            ApiError::BadRequest("invalid input".to_string()).to_string(),
            "Bad request: invalid input"
        );
        assert_eq!(
            ApiError::NotFound("line 9999X".to_string()).to_string(),
            "Not found: line 9999X"
        );
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ApiError::BadRequest(String::new()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound(String::new()), StatusCode::NOT_FOUND),
            (
                ApiError::ServiceUnavailable(String::new()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ApiError::BadGateway(String::new()), StatusCode::BAD_GATEWAY),
            (
                ApiError::RateLimited {
                    retry_after_secs: 1,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ApiError::Internal(String::new()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 7,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "7");
    }

    #[test]
    fn upstream_kinds_map_to_status() {
        assert!(matches!(
            ApiError::upstream(UpstreamFailureKind::NotFound, "x"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::upstream(UpstreamFailureKind::Transient, "x"),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::upstream(UpstreamFailureKind::CredentialMissing, "x"),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::upstream(UpstreamFailureKind::InvalidResponse, "x"),
            ApiError::BadGateway(_)
        ));
    }

    #[test]
    fn upstream_message_is_not_exposed() {
        let err = ApiError::from(ApplicationError::upstream(
            UpstreamFailureKind::Transient,
            "timeout calling http://api.olhovivo.sptrans.com.br",
        ));
        match err {
            ApiError::ServiceUnavailable(detail) => assert_eq!(detail, "transient"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn outcome_errors() {
        let stop = StopCandidate::literal(StopCode::new("340015345").unwrap());
        assert!(matches!(
            ApiError::from_outcome(&QueryOutcome::LineNotFoundForStop {
                line: "701U".to_string(),
                stop
            }),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_outcome(&QueryOutcome::FeatureDisabled {
                feature: "route_planning".to_string()
            }),
            ApiError::ServiceUnavailable(_)
        ));
    }

    #[test]
    fn error_response_serialization() {
        let body = ErrorResponse {
            error: "Not found".to_string(),
            code: "not_found".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("details"));
    }
}
