//! MobilizaSP HTTP presentation layer
//!
//! REST surface over the transit query engine: resource endpoints for
//! lines, stops and predictions, plus free-text and typed query endpoints.

pub mod error;
pub mod formatter;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use middleware::{ValidatedJson, ValidatedQuery, ValidationError};
pub use routes::{create_app, create_router};
pub use state::AppState;
