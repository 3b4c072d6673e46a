//! Route planner adapter - Implements RoutePlannerPort using the Google
//! Directions API restricted to bus transit

use std::time::Duration;

use application::error::ApplicationError;
use application::ports::RoutePlannerPort;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::MapsAppConfig;

/// Directions statuses that carry a usable (possibly empty) answer
const ACCEPTED_STATUSES: [&str; 2] = ["OK", "ZERO_RESULTS"];

/// Adapter for Google Directions
pub struct GoogleRoutePlannerAdapter {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl std::fmt::Debug for GoogleRoutePlannerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleRoutePlannerAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GoogleRoutePlannerAdapter {
    /// Create a new adapter
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key is set or the HTTP client
    /// cannot be built.
    pub fn new(config: &MapsAppConfig) -> Result<Self, ApplicationError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|_| config.is_enabled())
            .ok_or_else(|| ApplicationError::Configuration("maps.api_key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApplicationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Reject answers whose `status` reports an API-level failure
    fn check_status(body: &Value) -> Result<(), ApplicationError> {
        let status = body.get("status").and_then(Value::as_str).unwrap_or("OK");
        if ACCEPTED_STATUSES.contains(&status) {
            return Ok(());
        }

        let detail = body
            .get("error_message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Err(ApplicationError::ExternalService(format!(
            "Directions returned {status} {detail}"
        )))
    }
}

#[async_trait]
impl RoutePlannerPort for GoogleRoutePlannerAdapter {
    #[instrument(skip(self))]
    async fn plan_route(&self, origin: &str, destination: &str) -> Result<Value, ApplicationError> {
        let response = self
            .client
            .get(format!("{}/directions/json", self.base_url))
            .query(&[
                ("key", self.api_key.expose_secret()),
                ("origin", origin),
                ("destination", destination),
                ("mode", "transit"),
                ("transit_mode", "bus"),
                ("language", "pt-BR"),
                ("region", "br"),
            ])
            .send()
            .await
            .map_err(|e| ApplicationError::ExternalService(format!("Directions request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApplicationError::ExternalService(format!(
                "Directions returned HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApplicationError::ExternalService(format!("Invalid Directions response: {e}")))?;

        Self::check_status(&body)?;

        debug!(
            routes = body.get("routes").and_then(serde_json::Value::as_array).map_or(0, Vec::len),
            "Directions answered"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            GoogleRoutePlannerAdapter::new(&MapsAppConfig::default()),
            Err(ApplicationError::Configuration(_))
        ));
    }

    #[test]
    fn test_accepted_statuses() {
        assert!(GoogleRoutePlannerAdapter::check_status(&json!({"status": "OK"})).is_ok());
        assert!(GoogleRoutePlannerAdapter::check_status(&json!({"status": "ZERO_RESULTS"})).is_ok());
        assert!(GoogleRoutePlannerAdapter::check_status(&json!({})).is_ok());
    }

    #[test]
    fn test_rejected_status() {
        let err = GoogleRoutePlannerAdapter::check_status(&json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }))
        .unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED"));
    }
}
