//! Intent dispatch
//!
//! Turns a classified [`Intent`] into resolver and transit calls, in the
//! order each intent needs, and folds the result into a [`QueryOutcome`].
//!
//! Upstream failures become [`QueryOutcome::UpstreamFailure`] values. The
//! only failure the router absorbs is an upstream "not found" on a combined
//! stop and line prediction, which falls back to one stop-only query.

use std::sync::Arc;

use domain::{Intent, QueryOutcome, QueryPayload, UpstreamFailureKind};
use tracing::{debug, info, instrument, warn};

use super::{LineResolver, StopResolver};
use crate::error::ApplicationError;
use crate::ports::{RoutePlannerPort, TransitPort};

/// Name reported when route planning is not configured
pub const ROUTE_PLANNING_FEATURE: &str = "route_planning";

/// Routes classified intents to resolution and query sequences
pub struct IntentRouter {
    transit: Arc<dyn TransitPort>,
    lines: LineResolver,
    stops: StopResolver,
    route_planner: Option<Arc<dyn RoutePlannerPort>>,
}

impl std::fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRouter")
            .field("route_planner", &self.route_planner.is_some())
            .finish_non_exhaustive()
    }
}

impl IntentRouter {
    /// Create a router over a transit port
    pub fn new(transit: Arc<dyn TransitPort>) -> Self {
        Self {
            lines: LineResolver::new(Arc::clone(&transit)),
            stops: StopResolver::new(Arc::clone(&transit)),
            transit,
            route_planner: None,
        }
    }

    /// Enable route intents
    #[must_use]
    pub fn with_route_planner(mut self, planner: Arc<dyn RoutePlannerPort>) -> Self {
        self.route_planner = Some(planner);
        self
    }

    /// Whether route intents are served
    pub fn has_route_planner(&self) -> bool {
        self.route_planner.is_some()
    }

    /// Whether the transit API is reachable
    pub async fn is_transit_available(&self) -> bool {
        self.transit.is_available().await
    }

    /// Dispatch one intent
    ///
    /// # Errors
    ///
    /// Only errors that are not upstream failures (configuration, internal)
    /// are returned as `Err`; every upstream failure is an outcome.
    #[instrument(skip(self, intent), fields(intent = intent.kind()))]
    pub async fn resolve_and_query(&self, intent: &Intent) -> Result<QueryOutcome, ApplicationError> {
        let result = match intent {
            Intent::LineSearch { term } => self.line_search(term).await,
            Intent::Position { line } => self.positions(line).await,
            Intent::Prediction { stop, line } => self.predictions(stop, line.as_deref()).await,
            Intent::Route {
                origin,
                destination,
            } => self.route(origin, destination).await,
            Intent::Help => Ok(QueryOutcome::Help),
            Intent::Unknown => Ok(QueryOutcome::Unrecognized),
        };

        into_outcome(result)
    }

    /// Stops served by a resolved line
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::resolve_and_query`].
    #[instrument(skip(self))]
    pub async fn line_stops(&self, line: &str) -> Result<QueryOutcome, ApplicationError> {
        into_outcome(self.stops_of_line(line).await)
    }

    async fn stops_of_line(&self, line: &str) -> Result<QueryOutcome, ApplicationError> {
        let Some(candidate) = self.lines.resolve(line).await?.into_candidate() else {
            return Ok(QueryOutcome::LineNotFound {
                line: line.to_string(),
            });
        };

        let stops = self.transit.stops_for_line(candidate.code).await?;
        Ok(QueryOutcome::success(QueryPayload::LineStops {
            line: candidate,
            stops,
        }))
    }

    async fn line_search(&self, term: &str) -> Result<QueryOutcome, ApplicationError> {
        let term = term.trim();
        let lines = if term.is_empty() {
            Vec::new()
        } else {
            self.transit.search_lines(term).await?
        };

        debug!(count = lines.len(), "Line search finished");
        Ok(QueryOutcome::success(QueryPayload::Lines {
            term: term.to_string(),
            lines,
        }))
    }

    async fn positions(&self, line: &str) -> Result<QueryOutcome, ApplicationError> {
        let Some(candidate) = self.lines.resolve(line).await?.into_candidate() else {
            return Ok(QueryOutcome::LineNotFound {
                line: line.to_string(),
            });
        };

        let data = self.transit.vehicle_positions(candidate.code).await?;
        Ok(QueryOutcome::success(QueryPayload::Positions {
            line: candidate,
            data,
        }))
    }

    async fn predictions(
        &self,
        stop: &str,
        line: Option<&str>,
    ) -> Result<QueryOutcome, ApplicationError> {
        let Some(stop_candidate) = self.stops.resolve(stop).await?.into_candidate() else {
            return Ok(QueryOutcome::StopNotFound {
                stop: stop.to_string(),
            });
        };

        let Some(line) = line.filter(|l| !l.trim().is_empty()) else {
            let data = self.transit.predictions_for_stop(&stop_candidate.code).await?;
            return Ok(QueryOutcome::success(QueryPayload::Predictions {
                stop: stop_candidate,
                line: None,
                data,
            }));
        };

        let Some(line_candidate) = self.lines.resolve(line).await?.into_candidate() else {
            return Ok(QueryOutcome::LineNotFoundForStop {
                line: line.to_string(),
                stop: stop_candidate,
            });
        };

        match self
            .transit
            .predictions_for_stop_and_line(&stop_candidate.code, line_candidate.code)
            .await
        {
            Ok(data) => Ok(QueryOutcome::success(QueryPayload::Predictions {
                stop: stop_candidate,
                line: Some(line_candidate),
                data,
            })),
            Err(err) if err.is_not_found() => {
                warn!(
                    stop = %stop_candidate.code,
                    line = %line_candidate.code,
                    "No combined prediction, falling back to stop-only"
                );
                let data = self.transit.predictions_for_stop(&stop_candidate.code).await?;
                Ok(QueryOutcome::degraded(QueryPayload::Predictions {
                    stop: stop_candidate,
                    line: Some(line_candidate),
                    data,
                }))
            },
            Err(err) => Err(err),
        }
    }

    async fn route(&self, origin: &str, destination: &str) -> Result<QueryOutcome, ApplicationError> {
        let Some(planner) = &self.route_planner else {
            debug!("Route planning not configured");
            return Ok(QueryOutcome::FeatureDisabled {
                feature: ROUTE_PLANNING_FEATURE.to_string(),
            });
        };

        let data = planner.plan_route(origin, destination).await?;
        Ok(QueryOutcome::success(QueryPayload::Route {
            origin: origin.to_string(),
            destination: destination.to_string(),
            data,
        }))
    }
}

/// Turn external failures into outcomes; keep internal errors as errors
fn into_outcome(
    result: Result<QueryOutcome, ApplicationError>,
) -> Result<QueryOutcome, ApplicationError> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(ApplicationError::Upstream { kind, message }) => {
            info!(%kind, %message, "Upstream failure");
            Ok(QueryOutcome::UpstreamFailure { kind, message })
        },
        Err(ApplicationError::ExternalService(message)) => {
            info!(%message, "External service failure");
            Ok(QueryOutcome::UpstreamFailure {
                kind: UpstreamFailureKind::UpstreamError,
                message,
            })
        },
        Err(other) => Err(other),
    }
}
