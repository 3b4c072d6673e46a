//! Olho Vivo API client
//!
//! Typed wrappers over the search, position and prediction endpoints. Every
//! call goes through the shared [`TransitSession`], so login, retries and
//! session renewal are handled in one place.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{LineCandidate, LineCode, StopCandidate, StopCode};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::SptransConfig;
use crate::error::SptransError;
use crate::models::{parse_lines, parse_stops};
use crate::retry::RetryPolicy;
use crate::session::TransitSession;

/// Trait for Olho Vivo clients
#[async_trait]
pub trait SptransClient: Send + Sync {
    /// Every line variant matching a free-text term, in upstream order
    async fn search_lines(&self, term: &str) -> Result<Vec<LineCandidate>, SptransError>;

    /// Current vehicle positions of a line
    async fn vehicle_positions(&self, line: LineCode) -> Result<Value, SptransError>;

    /// Every stop matching a free-text term, in upstream order
    async fn search_stops(&self, term: &str) -> Result<Vec<StopCandidate>, SptransError>;

    /// Arrival predictions for every line serving a stop
    async fn predictions_for_stop(&self, stop: &StopCode) -> Result<Value, SptransError>;

    /// Arrival predictions for one line at one stop
    async fn predictions_for_stop_and_line(
        &self,
        stop: &StopCode,
        line: LineCode,
    ) -> Result<Value, SptransError>;

    /// Stops served by a line, in route order
    async fn stops_for_line(&self, line: LineCode) -> Result<Vec<StopCandidate>, SptransError>;

    /// Check that the API accepts the configured credential
    async fn is_healthy(&self) -> bool;
}

/// Olho Vivo client backed by a [`TransitSession`]
#[derive(Debug, Clone)]
pub struct OlhoVivoClient {
    session: Arc<TransitSession>,
}

impl OlhoVivoClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &SptransConfig) -> Result<Self, SptransError> {
        Ok(Self::from_session(TransitSession::new(config)?))
    }

    /// Create a client with a custom retry policy
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn with_retry_policy(
        config: &SptransConfig,
        policy: Arc<dyn RetryPolicy>,
    ) -> Result<Self, SptransError> {
        Ok(Self::from_session(
            TransitSession::new(config)?.with_retry_policy(policy),
        ))
    }

    /// Wrap an existing session
    #[must_use]
    pub fn from_session(session: TransitSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    /// The underlying session
    #[must_use]
    pub fn session(&self) -> &TransitSession {
        &self.session
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, SptransError> {
        self.session
            .authenticated_request(Method::GET, path, params)
            .await
    }
}

#[async_trait]
impl SptransClient for OlhoVivoClient {
    #[instrument(skip(self))]
    async fn search_lines(&self, term: &str) -> Result<Vec<LineCandidate>, SptransError> {
        let body = self
            .get("/Linha/Buscar", &[("termosBusca", term.to_string())])
            .await?;
        let lines = parse_lines(body)?;
        debug!(count = lines.len(), "Lines found");
        Ok(lines)
    }

    #[instrument(skip(self))]
    async fn vehicle_positions(&self, line: LineCode) -> Result<Value, SptransError> {
        self.get("/Posicao/Linha", &[("codigoLinha", line.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn search_stops(&self, term: &str) -> Result<Vec<StopCandidate>, SptransError> {
        let body = self
            .get("/Parada/Buscar", &[("termosBusca", term.to_string())])
            .await?;
        let stops = parse_stops(body)?;
        debug!(count = stops.len(), "Stops found");
        Ok(stops)
    }

    #[instrument(skip(self))]
    async fn predictions_for_stop(&self, stop: &StopCode) -> Result<Value, SptransError> {
        self.get(
            "/Previsao/Parada",
            &[("codigoParada", stop.as_str().to_string())],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn predictions_for_stop_and_line(
        &self,
        stop: &StopCode,
        line: LineCode,
    ) -> Result<Value, SptransError> {
        self.get(
            "/Previsao/ParadaLinha",
            &[
                ("codigoParada", stop.as_str().to_string()),
                ("codigoLinha", line.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn stops_for_line(&self, line: LineCode) -> Result<Vec<StopCandidate>, SptransError> {
        let body = self
            .get(
                "/Parada/BuscarParadasPorLinha",
                &[("codigoLinha", line.to_string())],
            )
            .await?;
        parse_stops(body)
    }

    async fn is_healthy(&self) -> bool {
        self.session.authenticate().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = OlhoVivoClient::new(&SptransConfig::for_testing());
        assert!(client.is_ok());
    }

    #[test]
    fn client_shares_session_across_clones() {
        let client = OlhoVivoClient::new(&SptransConfig::for_testing()).unwrap();
        let clone = client.clone();
        assert!(std::ptr::eq(client.session(), clone.session()));
    }

    #[tokio::test]
    async fn unhealthy_without_credential() {
        let client = OlhoVivoClient::new(&SptransConfig::default()).unwrap();
        assert!(!client.is_healthy().await);
    }
}
