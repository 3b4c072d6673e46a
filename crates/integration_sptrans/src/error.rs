//! Olho Vivo error types

use domain::UpstreamFailureKind;
use thiserror::Error;

/// Errors that can occur while talking to the Olho Vivo API
#[derive(Debug, Clone, Error)]
pub enum SptransError {
    /// No credential configured; no request was sent
    #[error("SPTrans API token is not configured")]
    CredentialMissing,

    /// The login handshake refused the credential
    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// An authenticated call was refused; the session must be renewed
    #[error("Session rejected by upstream (HTTP {status})")]
    SessionExpired {
        /// HTTP status of the rejection
        status: u16,
    },

    /// Connection to the API failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimitExceeded {
        /// Seconds to wait before retrying (if provided by API)
        retry_after_secs: Option<u64>,
    },

    /// The API failed with a 5xx status
    #[error("Server error: HTTP {status}")]
    ServerError {
        /// HTTP status
        status: u16,
    },

    /// The API reported that the resource does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API rejected the request with a client error other than 401/403/404/429
    #[error("Request rejected with HTTP {status}: {message}")]
    RequestRejected {
        /// HTTP status
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// Failed to parse a response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl SptransError {
    /// Returns true for failures that may succeed when repeated
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::Timeout { .. }
                | Self::RateLimitExceeded { .. }
                | Self::ServerError { .. }
        )
    }

    /// Returns true when the upstream explicitly reported "not found"
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Map to the caller-facing failure classification
    #[must_use]
    pub const fn failure_kind(&self) -> UpstreamFailureKind {
        match self {
            Self::CredentialMissing | Self::ConfigurationError(_) => {
                UpstreamFailureKind::CredentialMissing
            },
            Self::AuthenticationRejected(_) | Self::SessionExpired { .. } => {
                UpstreamFailureKind::AuthenticationRejected
            },
            Self::ConnectionFailed(_)
            | Self::Timeout { .. }
            | Self::RateLimitExceeded { .. }
            | Self::ServerError { .. } => UpstreamFailureKind::Transient,
            Self::NotFound(_) => UpstreamFailureKind::NotFound,
            Self::RequestRejected { .. } => UpstreamFailureKind::UpstreamError,
            Self::ParseError(_) => UpstreamFailureKind::InvalidResponse,
        }
    }
}
