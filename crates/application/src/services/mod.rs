//! Application services - transit query use cases

mod intent_classifier;
mod intent_router;
mod line_resolver;
mod stop_resolver;

pub use intent_classifier::{extract_json, IntentClassifier, INTENT_SYSTEM_PROMPT};
pub use intent_router::{IntentRouter, ROUTE_PLANNING_FEATURE};
pub use line_resolver::{select_line, LineQuery, LineResolver};
pub use stop_resolver::{rank_stops, score_stop, StopResolver};
