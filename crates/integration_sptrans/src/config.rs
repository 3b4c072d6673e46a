//! Olho Vivo client configuration

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Configuration for the SPTrans Olho Vivo API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SptransConfig {
    /// Base URL including the API version segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API credential issued by SPTrans (prefer env var MOBILIZA_SPTRANS__TOKEN)
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for the login handshake in seconds
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,

    /// Retry behaviour for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    "http://api.olhovivo.sptrans.com.br/v2.1".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_login_timeout_secs() -> u64 {
    10
}

impl Default for SptransConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            login_timeout_secs: default_login_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl SptransConfig {
    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            token: Some(SecretString::from("test-token")),
            timeout_secs: 5,
            login_timeout_secs: 5,
            retry: RetryConfig::immediate(),
            ..Default::default()
        }
    }

    /// Set the API credential
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// Whether a non-blank credential is configured
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().trim().is_empty())
    }

    /// Validate the configuration
    ///
    /// A missing credential is not a validation error: it is reported as
    /// `CredentialMissing` by the first request instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        url::Url::parse(&self.base_url).map_err(|e| format!("base_url is not a valid URL: {e}"))?;

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.login_timeout_secs == 0 {
            return Err("login_timeout_secs must be greater than 0".to_string());
        }

        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SptransConfig::default();
        assert_eq!(config.base_url, "http://api.olhovivo.sptrans.com.br/v2.1");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.login_timeout_secs, 10);
        assert!(config.token.is_none());
        assert!(!config.has_credential());
    }

    #[test]
    fn test_testing_config() {
        let config = SptransConfig::for_testing();
        assert!(config.has_credential());
        assert_eq!(config.retry.initial_delay_ms, 0);
    }

    #[test]
    fn test_blank_token_is_not_a_credential() {
        let config = SptransConfig::default().with_token("   ");
        assert!(!config.has_credential());
    }

    #[test]
    fn test_validation_success() {
        assert!(SptransConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_bad_url() {
        let config = SptransConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = SptransConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_not_serialized() {
        let config = SptransConfig::default().with_token("super-secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn test_deserialize_with_token() {
        let json = r#"{"token":"abc","timeout_secs":3}"#;
        let config: SptransConfig = serde_json::from_str(json).unwrap();
        assert!(config.has_credential());
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.login_timeout_secs, 10);
    }
}
