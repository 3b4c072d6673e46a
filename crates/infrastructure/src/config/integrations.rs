//! Third-party integrations: Gemini classifier, Google Maps directions.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

fn non_blank(secret: Option<&SecretString>) -> bool {
    secret.is_some_and(|s| !s.expose_secret().trim().is_empty())
}

fn validate_base_url(section: &str, base_url: &str, timeout_secs: u64) -> Result<(), String> {
    url::Url::parse(base_url)
        .map_err(|e| format!("{section}.base_url is not a valid URL: {e}"))?;
    if timeout_secs == 0 {
        return Err(format!("{section}.timeout_secs must be greater than 0"));
    }
    Ok(())
}

// ==============================
// Classifier Configuration
// ==============================

/// Gemini classifier configuration
///
/// When absent, only the built-in help patterns are recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierAppConfig {
    /// Gemini API key (prefer env var MOBILIZA_CLASSIFIER__API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Model name
    #[serde(default = "default_classifier_model")]
    pub model: String,

    /// Generative Language API base URL
    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

fn default_classifier_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_classifier_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

const fn default_classifier_timeout() -> u64 {
    15
}

impl Default for ClassifierAppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_classifier_model(),
            base_url: default_classifier_base_url(),
            timeout_secs: default_classifier_timeout(),
        }
    }
}

impl ClassifierAppConfig {
    /// Configuration pointing at a local mock server
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from("test-key")),
            base_url: base_url.into(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Whether a usable API key is configured
    pub fn is_enabled(&self) -> bool {
        non_blank(self.api_key.as_ref())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("classifier.model must not be empty".to_string());
        }
        validate_base_url("classifier", &self.base_url, self.timeout_secs)
    }
}

// ==============================
// Maps Configuration
// ==============================

/// Google Maps configuration for route planning
///
/// When absent, route intents report the feature as disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsAppConfig {
    /// Google Maps API key (prefer env var MOBILIZA_MAPS__API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Maps API base URL
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_maps_timeout")]
    pub timeout_secs: u64,
}

fn default_maps_base_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

const fn default_maps_timeout() -> u64 {
    15
}

impl Default for MapsAppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_maps_base_url(),
            timeout_secs: default_maps_timeout(),
        }
    }
}

impl MapsAppConfig {
    /// Configuration pointing at a local mock server
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from("test-key")),
            base_url: base_url.into(),
            timeout_secs: 5,
        }
    }

    /// Whether a usable API key is configured
    pub fn is_enabled(&self) -> bool {
        non_blank(self.api_key.as_ref())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_base_url("maps", &self.base_url, self.timeout_secs)
    }
}
