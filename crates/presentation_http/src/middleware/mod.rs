//! HTTP middleware components
//!
//! Per-IP rate limiting, security response headers, request id
//! correlation and request validation extractors.

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod validation;

pub use rate_limit::{
    RateLimiter, RateLimiterConfig, RateLimiterLayer, RateLimiterState, spawn_cleanup_task,
};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer, RequestIdService};
pub use security_headers::{SecurityHeaders, SecurityHeadersLayer};
pub use validation::{ValidatedJson, ValidatedQuery, ValidationError};
