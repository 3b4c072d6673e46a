//! Transit adapter - Implements TransitPort using integration_sptrans

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::TransitPort;
use async_trait::async_trait;
use domain::{LineCandidate, LineCode, StopCandidate, StopCode};
use integration_sptrans::{OlhoVivoClient, SptransClient, SptransConfig, SptransError};
use serde_json::Value;
use tracing::{instrument, warn};

/// Adapter for the SPTrans Olho Vivo API
#[derive(Clone)]
pub struct SptransTransitAdapter {
    client: Arc<dyn SptransClient>,
}

impl std::fmt::Debug for SptransTransitAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SptransTransitAdapter")
            .field("client", &"SptransClient")
            .finish()
    }
}

impl SptransTransitAdapter {
    /// Create an adapter with a session-backed Olho Vivo client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client cannot be built.
    pub fn new(config: &SptransConfig) -> Result<Self, ApplicationError> {
        let client = OlhoVivoClient::new(config)
            .map_err(|e| ApplicationError::Configuration(format!("SPTrans client: {e}")))?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Create an adapter over any client implementation
    pub fn with_client(client: Arc<dyn SptransClient>) -> Self {
        Self { client }
    }

    /// Convert an integration error into an upstream failure
    fn map_error(e: SptransError) -> ApplicationError {
        let kind = e.failure_kind();
        if kind.is_configuration() {
            warn!(error = %e, "SPTrans credential problem");
        }
        ApplicationError::upstream(kind, e.to_string())
    }
}

#[async_trait]
impl TransitPort for SptransTransitAdapter {
    #[instrument(skip(self))]
    async fn search_lines(&self, term: &str) -> Result<Vec<LineCandidate>, ApplicationError> {
        self.client.search_lines(term).await.map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    async fn vehicle_positions(&self, line: LineCode) -> Result<Value, ApplicationError> {
        self.client
            .vehicle_positions(line)
            .await
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    async fn search_stops(&self, term: &str) -> Result<Vec<StopCandidate>, ApplicationError> {
        self.client.search_stops(term).await.map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    async fn predictions_for_stop(&self, stop: &StopCode) -> Result<Value, ApplicationError> {
        self.client
            .predictions_for_stop(stop)
            .await
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    async fn predictions_for_stop_and_line(
        &self,
        stop: &StopCode,
        line: LineCode,
    ) -> Result<Value, ApplicationError> {
        self.client
            .predictions_for_stop_and_line(stop, line)
            .await
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    async fn stops_for_line(&self, line: LineCode) -> Result<Vec<StopCandidate>, ApplicationError> {
        self.client
            .stops_for_line(line)
            .await
            .map_err(Self::map_error)
    }

    async fn is_available(&self) -> bool {
        self.client.is_healthy().await
    }
}
