//! Transit API port
//!
//! Defines the queries the resolvers and the intent router need from the
//! upstream transit API. The infrastructure layer implements this port on top
//! of the Olho Vivo session client.

use async_trait::async_trait;
use domain::{LineCandidate, LineCode, StopCandidate, StopCode};
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::error::ApplicationError;

/// Port for transit telemetry queries
///
/// Every method that fails upstream returns [`ApplicationError::Upstream`]
/// with the failure classified.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransitPort: Send + Sync {
    /// Every line variant matching a term, in upstream order
    async fn search_lines(&self, term: &str) -> Result<Vec<LineCandidate>, ApplicationError>;

    /// Current vehicle positions of a line
    async fn vehicle_positions(&self, line: LineCode) -> Result<Value, ApplicationError>;

    /// Every stop matching a term, in upstream order
    async fn search_stops(&self, term: &str) -> Result<Vec<StopCandidate>, ApplicationError>;

    /// Arrival predictions for all lines at a stop
    async fn predictions_for_stop(&self, stop: &StopCode) -> Result<Value, ApplicationError>;

    /// Arrival predictions for one line at a stop
    async fn predictions_for_stop_and_line(
        &self,
        stop: &StopCode,
        line: LineCode,
    ) -> Result<Value, ApplicationError>;

    /// Stops served by a line, in route order
    async fn stops_for_line(&self, line: LineCode) -> Result<Vec<StopCandidate>, ApplicationError>;

    /// Check if the transit API is reachable with the configured credential
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn TransitPort) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TransitPort>();
    }

    #[tokio::test]
    async fn mock_returns_configured_lines() {
        let mut mock = MockTransitPort::new();
        mock.expect_search_lines().returning(|_| Ok(Vec::new()));
        mock.expect_is_available().returning(|| true);

        assert!(mock.search_lines("701U").await.unwrap().is_empty());
        assert!(mock.is_available().await);
    }
}
