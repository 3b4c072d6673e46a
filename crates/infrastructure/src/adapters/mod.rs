//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod gemini_classifier_adapter;
mod route_planner_adapter;
mod transit_adapter;

pub use gemini_classifier_adapter::GeminiClassifierAdapter;
pub use route_planner_adapter::GoogleRoutePlannerAdapter;
pub use transit_adapter::SptransTransitAdapter;
