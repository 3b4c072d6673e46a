//! Route planning handler

use axum::{Json, extract::State};
use domain::Intent;
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use super::common::PayloadResponse;
use crate::{error::ApiError, state::AppState, middleware::ValidatedQuery};

/// Route query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct RouteParams {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub origem: String,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub destino: String,
}

/// Bus route between two places
#[instrument(skip(state))]
pub async fn route(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<RouteParams>,
) -> Result<Json<PayloadResponse>, ApiError> {
    let intent = Intent::Route {
        origin: params.origem,
        destination: params.destino,
    };
    let outcome = state.router.resolve_and_query(&intent).await?;
    Ok(Json(PayloadResponse::try_from(outcome)?))
}
