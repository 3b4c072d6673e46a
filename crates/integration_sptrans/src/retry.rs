//! Retry policy with exponential backoff
//!
//! The session asks a [`RetryPolicy`] what to do after every failed attempt.
//! Policies are pure: they see the request method, the error and the attempt
//! number, and answer with a [`RetryDecision`]. [`ExponentialBackoff`] is the
//! production policy; tests inject [`RetryConfig::immediate`] to run without
//! sleeping.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::SptransError;

/// Configuration for retry behavior with exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial delay before first retry in milliseconds (default: 200ms)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds (default: 5000ms)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Maximum number of retries after the first attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether to add jitter to prevent thundering herd (default: true)
    #[serde(default = "default_true")]
    pub jitter_enabled: bool,

    /// Maximum jitter factor (0.0 to 1.0, default: 0.1 = 10%)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

const fn default_initial_delay() -> u64 {
    200
}

const fn default_max_delay() -> u64 {
    5_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_true() -> bool {
    true
}

const fn default_jitter_factor() -> f64 {
    0.1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            max_retries: default_max_retries(),
            jitter_enabled: default_true(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom parameters
    #[must_use]
    pub const fn new(
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
            max_retries,
            jitter_enabled: true,
            jitter_factor: 0.1,
        }
    }

    /// Same attempt ceiling as the default, but no waiting between attempts
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
            max_retries: 3,
            jitter_enabled: false,
            jitter_factor: 0.0,
        }
    }

    /// Never retry
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::immediate()
        }
    }

    /// Disable jitter (not recommended for production)
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter_enabled = false;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.multiplier < 1.0 {
            return Err("retry.multiplier must be at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("retry.jitter_factor must be between 0.0 and 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("retry.initial_delay_ms must not exceed retry.max_delay_ms".to_string());
        }
        Ok(())
    }

    /// Capped delay before jitter for a given retry (0-indexed)
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation
    )]
    fn capped_delay_ms(&self, attempt: u32) -> f64 {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base_delay = (self.initial_delay_ms as f64) * self.multiplier.powi(exponent);
        base_delay.min(self.max_delay_ms as f64)
    }

    /// Calculate the delay for a given retry (0-indexed)
    ///
    /// delay = initial_delay * multiplier^attempt, capped at max_delay, with
    /// optional jitter of ±jitter_factor.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped_delay = self.capped_delay_ms(attempt);

        let final_delay = if self.jitter_enabled && capped_delay > 0.0 {
            let jitter_range = capped_delay * self.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Largest delay [`Self::delay_for_attempt`] can return for this retry
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn max_delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped_delay = self.capped_delay_ms(attempt);
        let bound = if self.jitter_enabled {
            capped_delay * (1.0 + self.jitter_factor)
        } else {
            capped_delay
        };
        Duration::from_millis(bound.ceil() as u64)
    }

    /// Upper bound on the latency of one authenticated request
    ///
    /// One request may run two cycles (the original and the one after a
    /// re-login). Each cycle is a login plus the request, and each of those
    /// may take `max_retries + 1` attempts separated by backoff.
    #[must_use]
    pub fn worst_case_latency(&self, request_timeout: Duration, login_timeout: Duration) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff: Duration = (0..self.max_retries)
            .map(|attempt| self.max_delay_for_attempt(attempt))
            .sum();

        let login = login_timeout * attempts + backoff;
        let request = request_timeout * attempts + backoff;
        (login + request) * 2
    }
}

/// What the session should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the delay, then send the request again
    Retry {
        /// Backoff before the next attempt
        delay: Duration,
    },
    /// Surface the error to the caller
    GiveUp,
}

/// Facts about a failed attempt
#[derive(Debug)]
pub struct RetryContext<'a> {
    /// Method of the failed request
    pub method: &'a Method,
    /// Error of the failed attempt
    pub error: &'a SptransError,
    /// Attempts made so far, including the failed one (1-based)
    pub attempt: u32,
}

/// Decides whether a failed request is retried
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Decide what to do after a failed attempt
    fn decide(&self, ctx: &RetryContext<'_>) -> RetryDecision;
}

/// Returns true for methods that may be repeated without side effects
#[must_use]
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

/// Capped exponential backoff
///
/// Retries idempotent requests that failed transiently, and any request that
/// was rate limited. Everything else is surfaced immediately.
#[derive(Debug, Clone, Default)]
pub struct ExponentialBackoff {
    config: RetryConfig,
}

impl ExponentialBackoff {
    /// Create a policy from configuration
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The underlying configuration
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn decide(&self, ctx: &RetryContext<'_>) -> RetryDecision {
        if ctx.attempt > self.config.max_retries {
            return RetryDecision::GiveUp;
        }

        let eligible = match ctx.error {
            SptransError::RateLimitExceeded { .. } => true,
            err if err.is_transient() => is_idempotent(ctx.method),
            _ => false,
        };
        if !eligible {
            return RetryDecision::GiveUp;
        }

        let mut delay = self.config.delay_for_attempt(ctx.attempt - 1);
        if let SptransError::RateLimitExceeded {
            retry_after_secs: Some(secs),
        } = ctx.error
        {
            let cap = Duration::from_millis(self.config.max_delay_ms);
            delay = delay.max(Duration::from_secs(*secs).min(cap));
        }

        RetryDecision::Retry { delay }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(policy: &ExponentialBackoff, method: &Method, error: &SptransError, attempt: u32) -> RetryDecision {
        policy.decide(&RetryContext {
            method,
            error,
            attempt,
        })
    }

    #[test]
    fn config_default_values() {
        let config = RetryConfig::default();
        assert_eq!(config.initial_delay_ms, 200);
        assert_eq!(config.max_delay_ms, 5_000);
        assert!((config.multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.max_retries, 3);
        assert!(config.jitter_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn delay_calculation_without_jitter() {
        let config = RetryConfig::new(100, 10_000, 2.0, 3).without_jitter();

        assert_eq!(config.delay_for_attempt(0).as_millis(), 100);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 200);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 400);
        assert_eq!(config.delay_for_attempt(3).as_millis(), 800);
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig::new(1000, 2000, 2.0, 5).without_jitter();

        assert_eq!(config.delay_for_attempt(0).as_millis(), 1000);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 2000);
        assert_eq!(config.delay_for_attempt(10).as_millis(), 2000);
        assert_eq!(config.delay_for_attempt(500).as_millis(), 2000);
    }

    #[test]
    fn delay_with_jitter_in_range() {
        let config = RetryConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 1000,
            multiplier: 1.0,
            max_retries: 3,
            jitter_enabled: true,
            jitter_factor: 0.1,
        };

        for _ in 0..20 {
            let delay_ms = config.delay_for_attempt(0).as_millis();
            assert!(
                (900..=1100).contains(&delay_ms),
                "delay_ms={delay_ms} out of range"
            );
        }
        assert_eq!(config.max_delay_for_attempt(0).as_millis(), 1100);
    }

    #[test]
    fn immediate_config_never_waits() {
        let config = RetryConfig::immediate();
        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(3), Duration::ZERO);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = RetryConfig::default();
        config.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = RetryConfig::default();
        config.jitter_factor = 1.5;
        assert!(config.validate().is_err());

        let config = RetryConfig::new(10_000, 100, 2.0, 3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserialization_uses_defaults() {
        let json = r#"{"initial_delay_ms":50,"max_retries":5}"#;
        let config: RetryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.initial_delay_ms, 50);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_delay_ms, 5_000);
    }

    #[test]
    fn worst_case_latency_is_finite_and_exact_without_jitter() {
        let config = RetryConfig::new(100, 400, 2.0, 3).without_jitter();
        // backoff: 100 + 200 + 400 = 700ms; 4 attempts each
        let bound = config.worst_case_latency(Duration::from_secs(10), Duration::from_secs(5));
        let login = Duration::from_secs(20) + Duration::from_millis(700);
        let request = Duration::from_secs(40) + Duration::from_millis(700);
        assert_eq!(bound, (login + request) * 2);
    }

    #[test]
    fn policy_retries_transient_get() {
        let policy = ExponentialBackoff::new(RetryConfig::new(100, 1000, 2.0, 3).without_jitter());
        let err = SptransError::ServerError { status: 503 };

        assert_eq!(
            decide(&policy, &Method::GET, &err, 1),
            RetryDecision::Retry {
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(
            decide(&policy, &Method::GET, &err, 3),
            RetryDecision::Retry {
                delay: Duration::from_millis(400)
            }
        );
        assert_eq!(decide(&policy, &Method::GET, &err, 4), RetryDecision::GiveUp);
    }

    #[test]
    fn policy_does_not_retry_transient_post() {
        let policy = ExponentialBackoff::default();
        let err = SptransError::ConnectionFailed("reset".to_string());
        assert_eq!(decide(&policy, &Method::POST, &err, 1), RetryDecision::GiveUp);
    }

    #[test]
    fn policy_retries_rate_limited_post() {
        let policy = ExponentialBackoff::new(RetryConfig::immediate());
        let err = SptransError::RateLimitExceeded {
            retry_after_secs: None,
        };
        assert!(matches!(
            decide(&policy, &Method::POST, &err, 1),
            RetryDecision::Retry { .. }
        ));
    }

    #[test]
    fn policy_honours_retry_after_up_to_cap() {
        let policy = ExponentialBackoff::new(RetryConfig::new(10, 2_000, 2.0, 3).without_jitter());
        let err = SptransError::RateLimitExceeded {
            retry_after_secs: Some(60),
        };
        assert_eq!(
            decide(&policy, &Method::GET, &err, 1),
            RetryDecision::Retry {
                delay: Duration::from_millis(2_000)
            }
        );
    }

    #[test]
    fn policy_gives_up_on_terminal_errors() {
        let policy = ExponentialBackoff::default();
        for err in [
            SptransError::CredentialMissing,
            SptransError::AuthenticationRejected("false".to_string()),
            SptransError::NotFound("/x".to_string()),
            SptransError::RequestRejected {
                status: 400,
                message: String::new(),
            },
            SptransError::ParseError("eof".to_string()),
        ] {
            assert_eq!(decide(&policy, &Method::GET, &err, 1), RetryDecision::GiveUp);
        }
    }

    #[test]
    fn disabled_config_never_retries() {
        let policy = ExponentialBackoff::new(RetryConfig::disabled());
        let err = SptransError::Timeout { timeout_secs: 1 };
        assert_eq!(decide(&policy, &Method::GET, &err, 1), RetryDecision::GiveUp);
    }

    #[test]
    fn idempotent_methods() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::DELETE));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }
}
