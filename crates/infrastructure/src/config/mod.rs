//! Application configuration
//!
//! Split into focused sub-modules:
//! - `server`: HTTP server settings
//! - `integrations`: Gemini classifier, Google Maps directions
//!
//! The transit API section reuses [`integration_sptrans::SptransConfig`] and
//! logging reuses [`crate::telemetry::TelemetryConfig`].
//!
//! Sources, later ones overriding earlier ones: built-in defaults, an
//! optional `config.toml` in the working directory, then `MOBILIZA_*`
//! environment variables with `__` between nested keys
//! (e.g. `MOBILIZA_SPTRANS__TOKEN`, `MOBILIZA_SERVER__PORT`).

mod integrations;
mod server;

use config::{ConfigError, Environment};
use integration_sptrans::SptransConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use integrations::{ClassifierAppConfig, MapsAppConfig};
pub use server::ServerConfig;

use crate::telemetry::TelemetryConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MOBILIZA";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// SPTrans Olho Vivo configuration
    #[serde(default)]
    pub sptrans: SptransConfig,

    /// Intent classifier configuration (optional)
    #[serde(default)]
    pub classifier: Option<ClassifierAppConfig>,

    /// Route planning configuration (optional)
    #[serde(default)]
    pub maps: Option<MapsAppConfig>,

    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment and optional file
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails
    /// validation.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(environment_source());

        Self::from_config(builder.build()?)
    }

    /// Deserialize and validate an already built configuration
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization or validation fails.
    pub fn from_config(config: config::Config) -> Result<Self, ConfigError> {
        let app: Self = config.try_deserialize()?;
        app.validate().map_err(ConfigError::Message)?;

        if !app.sptrans.has_credential() {
            warn!("No SPTrans credential configured; transit queries will fail");
        }

        Ok(app)
    }

    /// Configuration for tests
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::for_testing(),
            sptrans: SptransConfig::for_testing(),
            classifier: None,
            maps: None,
            telemetry: TelemetryConfig::for_testing(),
        }
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, prefixed with its section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.sptrans
            .validate()
            .map_err(|e| format!("sptrans: {e}"))?;
        if let Some(classifier) = &self.classifier {
            classifier.validate()?;
        }
        if let Some(maps) = &self.maps {
            maps.validate()?;
        }
        self.telemetry.validate()
    }

    /// Classifier section, if configured with an API key
    pub fn enabled_classifier(&self) -> Option<&ClassifierAppConfig> {
        self.classifier.as_ref().filter(|c| c.is_enabled())
    }

    /// Maps section, if configured with an API key
    pub fn enabled_maps(&self) -> Option<&MapsAppConfig> {
        self.maps.as_ref().filter(|m| m.is_enabled())
    }
}

/// Environment variable source (`MOBILIZA_SECTION__KEY`)
pub fn environment_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("server.allowed_origins")
        .with_list_parse_key("server.trusted_proxies")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use config::{File, FileFormat};
    use secrecy::ExposeSecret;

    use super::*;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        let config = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        AppConfig::from_config(config)
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sptrans.timeout_secs, 10);
        assert!(config.classifier.is_none());
        assert!(config.enabled_maps().is_none());
    }

    #[test]
    fn test_file_values() {
        let config = from_toml(
            r#"
            [server]
            port = 8080

            [sptrans]
            token = "abc"
            timeout_secs = 3

            [sptrans.retry]
            max_retries = 1

            [maps]
            api_key = "maps-key"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.sptrans.has_credential());
        assert_eq!(config.sptrans.timeout_secs, 3);
        assert_eq!(config.sptrans.retry.max_retries, 1);
        assert!(config.enabled_maps().is_some());
        assert!(config.enabled_classifier().is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = from_toml("[sptrans]\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let env = HashMap::from([
            ("MOBILIZA_SPTRANS__TOKEN".to_string(), "from-env".to_string()),
            ("MOBILIZA_SERVER__PORT".to_string(), "9000".to_string()),
            (
                "MOBILIZA_SERVER__ALLOWED_ORIGINS".to_string(),
                "http://a.example,http://b.example".to_string(),
            ),
        ]);

        let config = config::Config::builder()
            .add_source(File::from_str(
                "[sptrans]\ntoken = \"from-file\"\n",
                FileFormat::Toml,
            ))
            .add_source(environment_source().source(Some(env)))
            .build()
            .unwrap();
        let config = AppConfig::from_config(config).unwrap();

        let token = config.sptrans.token.as_ref().unwrap();
        assert_eq!(token.expose_secret(), "from-env");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.allowed_origins.len(), 2);
    }

    #[test]
    fn test_for_testing_is_valid() {
        assert!(AppConfig::for_testing().validate().is_ok());
    }
}
