//! Application-level errors

use domain::{DomainError, UpstreamFailureKind};
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// An upstream transit call failed terminally
    #[error("Upstream {kind} failure: {message}")]
    Upstream {
        /// Failure classification
        kind: UpstreamFailureKind,
        /// Diagnostic message
        message: String,
    },

    /// The intent classifier could not be reached or answered garbage
    #[error("Classification error: {0}")]
    Classification(String),

    /// Any other external service error (route planner, ...)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Create an upstream failure
    pub fn upstream(kind: UpstreamFailureKind, message: impl Into<String>) -> Self {
        Self::Upstream {
            kind,
            message: message.into(),
        }
    }

    /// Failure classification, for upstream failures
    pub const fn upstream_kind(&self) -> Option<UpstreamFailureKind> {
        match self {
            Self::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether the upstream reported that the resource does not exist
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Upstream {
                kind: UpstreamFailureKind::NotFound,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_kind_accessor() {
        let err = ApplicationError::upstream(UpstreamFailureKind::NotFound, "/Previsao");
        assert_eq!(err.upstream_kind(), Some(UpstreamFailureKind::NotFound));
        assert!(err.is_not_found());
    }

    #[test]
    fn transient_is_not_a_miss() {
        let err = ApplicationError::upstream(UpstreamFailureKind::Transient, "timeout");
        assert!(!err.is_not_found());
    }

    #[test]
    fn non_upstream_has_no_kind() {
        let err = ApplicationError::Internal("boom".to_string());
        assert!(err.upstream_kind().is_none());
        assert_eq!(err.to_string(), "Internal error: boom");
    }

    #[test]
    fn upstream_display_includes_kind() {
        let err = ApplicationError::upstream(UpstreamFailureKind::AuthenticationRejected, "false");
        assert_eq!(
            err.to_string(),
            "Upstream authentication_rejected failure: false"
        );
    }

    #[test]
    fn domain_error_converts() {
        let err: ApplicationError = DomainError::InvalidStopCode(String::new()).into();
        assert!(matches!(err, ApplicationError::Domain(_)));
    }
}
