//! Query handlers
//!
//! `POST /v1/query` classifies free text first; `POST /v1/intent` takes an
//! already typed intent. Both always answer with the outcome and its
//! rendered text, including for misses and upstream failures.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use domain::{Intent, QueryOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::{error::ApiError, formatter, state::AppState, middleware::ValidatedJson};

/// Free-text query
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 500, message = "must be between 1 and 500 characters"))]
    pub text: String,
}

/// Query result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Intent that was dispatched
    pub intent: Intent,
    /// Structured outcome
    pub outcome: QueryOutcome,
    /// Outcome rendered as a chat message
    pub text: String,
}

async fn dispatch(state: &AppState, intent: Intent) -> Result<QueryResponse, ApiError> {
    let outcome = state.router.resolve_and_query(&intent).await?;
    let text = formatter::render(&outcome);
    Ok(QueryResponse {
        intent,
        outcome,
        text,
    })
}

/// Classify free text and dispatch it
#[instrument(skip(state, request), fields(text_len = request.text.len()))]
pub async fn query(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let intent = state.classifier.classify(&request.text).await;
    info!(intent = intent.kind(), "Query classified");
    Ok(Json(dispatch(&state, intent).await?))
}

/// Dispatch a typed intent
#[instrument(skip(state, body))]
pub async fn dispatch_intent(
    State(state): State<AppState>,
    body: Result<Json<Intent>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(intent) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(dispatch(&state, intent).await?))
}
