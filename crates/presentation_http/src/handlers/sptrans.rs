//! Transit resource handlers
//!
//! Thin wrappers over [`application::IntentRouter`]: every reference in the
//! path is resolved the same way a chat message would be.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use domain::Intent;
use serde::Deserialize;
use tracing::instrument;

use super::common::PayloadResponse;
use crate::{error::ApiError, state::AppState};

/// Optional line filter for predictions
#[derive(Debug, Deserialize)]
pub struct PredictionParams {
    pub linha: Option<String>,
}

/// Raw line search
#[instrument(skip(state))]
pub async fn search_lines(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<Json<PayloadResponse>, ApiError> {
    let outcome = state
        .router
        .resolve_and_query(&Intent::LineSearch { term })
        .await?;
    Ok(Json(PayloadResponse::try_from(outcome)?))
}

/// Vehicle positions of a resolved line
#[instrument(skip(state))]
pub async fn vehicle_positions(
    State(state): State<AppState>,
    Path(line): Path<String>,
) -> Result<Json<PayloadResponse>, ApiError> {
    let outcome = state
        .router
        .resolve_and_query(&Intent::Position { line })
        .await?;
    Ok(Json(PayloadResponse::try_from(outcome)?))
}

/// Arrival predictions at a resolved stop, optionally for one line
#[instrument(skip(state))]
pub async fn predictions(
    State(state): State<AppState>,
    Path(stop): Path<String>,
    Query(params): Query<PredictionParams>,
) -> Result<Json<PayloadResponse>, ApiError> {
    let intent = Intent::Prediction {
        stop,
        line: params.linha,
    };
    let outcome = state.router.resolve_and_query(&intent).await?;
    Ok(Json(PayloadResponse::try_from(outcome)?))
}

/// Stops served by a resolved line
#[instrument(skip(state))]
pub async fn line_stops(
    State(state): State<AppState>,
    Path(line): Path<String>,
) -> Result<Json<PayloadResponse>, ApiError> {
    let outcome = state.router.line_stops(&line).await?;
    Ok(Json(PayloadResponse::try_from(outcome)?))
}
