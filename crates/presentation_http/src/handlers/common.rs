//! Shared response shapes

use domain::{QueryOutcome, QueryPayload};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Successful resource response: the payload plus its degradation flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadResponse {
    #[serde(flatten)]
    pub payload: QueryPayload,
    pub degraded: bool,
}

impl TryFrom<QueryOutcome> for PayloadResponse {
    type Error = ApiError;

    fn try_from(outcome: QueryOutcome) -> Result<Self, Self::Error> {
        match outcome {
            QueryOutcome::Success { payload, degraded } => Ok(Self { payload, degraded }),
            other => Err(ApiError::from_outcome(&other)),
        }
    }
}
