//! HTTP server configuration.

use std::{net::IpAddr, time::Duration};

use serde::{Deserialize, Serialize};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins (empty = allow any origin)
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Graceful shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum body size for JSON requests in bytes (default: 64KB)
    #[serde(default = "default_max_body_json")]
    pub max_body_size_json_bytes: usize,

    /// Enable per-IP rate limiting
    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,

    /// Requests per minute per client IP
    #[serde(default = "default_rate_limit")]
    pub rate_limit_rpm: u32,

    /// Interval between sweeps of idle rate limiter entries
    #[serde(default = "default_cleanup_interval")]
    pub rate_limit_cleanup_interval_secs: u64,

    /// Idle time after which a client's rate limiter entry is dropped
    #[serde(default = "default_cleanup_max_age")]
    pub rate_limit_cleanup_max_age_secs: u64,

    /// Peers allowed to set `X-Forwarded-For`
    ///
    /// Empty means the connection address is always used.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_shutdown_timeout() -> u64 {
    30
}

const fn default_max_body_json() -> usize {
    64 * 1024
}

const fn default_true() -> bool {
    true
}

const fn default_rate_limit() -> u32 {
    60
}

const fn default_cleanup_interval() -> u64 {
    300
}

const fn default_cleanup_max_age() -> u64 {
    600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_size_json_bytes: default_max_body_json(),
            rate_limit_enabled: true,
            rate_limit_rpm: default_rate_limit(),
            rate_limit_cleanup_interval_secs: default_cleanup_interval(),
            rate_limit_cleanup_max_age_secs: default_cleanup_max_age(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Configuration for tests: ephemeral port, short shutdown, no rate limit
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            shutdown_timeout_secs: 1,
            rate_limit_enabled: false,
            ..Default::default()
        }
    }

    /// `host:port` bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Graceful shutdown timeout
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Interval between rate limiter sweeps
    pub const fn rate_limit_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cleanup_interval_secs)
    }

    /// Idle age after which rate limiter entries are swept
    pub const fn rate_limit_cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cleanup_max_age_secs)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("server.host must not be empty".to_string());
        }

        if self.max_body_size_json_bytes == 0 {
            return Err("server.max_body_size_json_bytes must be greater than 0".to_string());
        }

        if self.rate_limit_enabled && self.rate_limit_rpm == 0 {
            return Err("server.rate_limit_rpm must be greater than 0".to_string());
        }

        if self.rate_limit_cleanup_interval_secs == 0 {
            return Err("server.rate_limit_cleanup_interval_secs must be greater than 0".to_string());
        }

        if let Some(origin) = self
            .allowed_origins
            .iter()
            .find(|o| url::Url::parse(o).is_err())
        {
            return Err(format!("server.allowed_origins contains an invalid origin: {origin}"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert!(config.allowed_origins.is_empty());
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_rpm, 60);
        assert!(config.trusted_proxies.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_rate_limit() {
        let config = ServerConfig {
            rate_limit_rpm: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let disabled = ServerConfig {
            rate_limit_rpm: 0,
            ..ServerConfig::for_testing()
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_trusted_proxies_deserialize() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"trusted_proxies": ["10.0.0.1", "::1"]}"#).unwrap();
        assert_eq!(config.trusted_proxies.len(), 2);
        assert_eq!(config.rate_limit_cleanup_max_age(), Duration::from_secs(600));
    }

    #[test]
    fn test_invalid_origin() {
        let config = ServerConfig {
            allowed_origins: vec!["not a url".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_origin() {
        let config = ServerConfig {
            allowed_origins: vec!["https://mobiliza.example".to_string()],
            ..ServerConfig::for_testing()
        };
        assert!(config.validate().is_ok());
    }
}
