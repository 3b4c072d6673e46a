//! Route planner port
//!
//! Public transport directions between two free-text places. Optional: when
//! no adapter is configured, route intents report the feature as disabled.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::error::ApplicationError;

/// Port for public transport route planning
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoutePlannerPort: Send + Sync {
    /// Plan a bus route; the planner payload is returned unmodified
    async fn plan_route(&self, origin: &str, destination: &str) -> Result<Value, ApplicationError>;
}
