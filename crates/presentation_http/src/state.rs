//! Application state shared across handlers

use std::sync::Arc;

use application::{ApplicationError, IntentClassifier, IntentRouter};
use infrastructure::{
    AppConfig, GeminiClassifierAdapter, GoogleRoutePlannerAdapter, SptransTransitAdapter,
};
use tracing::info;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Intent dispatch over the transit API and route planner
    pub router: Arc<IntentRouter>,
    /// Free-text classifier
    pub classifier: Arc<IntentClassifier>,
}

impl AppState {
    /// Create state from the two services
    pub fn new(router: IntentRouter, classifier: IntentClassifier) -> Self {
        Self {
            router: Arc::new(router),
            classifier: Arc::new(classifier),
        }
    }

    /// Wire adapters from configuration
    ///
    /// Sections without an API key leave their feature off.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an adapter cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApplicationError> {
        let transit = SptransTransitAdapter::new(&config.sptrans)?;
        let mut router = IntentRouter::new(Arc::new(transit));
        if let Some(maps) = config.enabled_maps() {
            router = router.with_route_planner(Arc::new(GoogleRoutePlannerAdapter::new(maps)?));
        }

        let mut classifier = IntentClassifier::new();
        if let Some(model) = config.enabled_classifier() {
            classifier = classifier.with_model(Arc::new(GeminiClassifierAdapter::new(model)?));
        }

        info!(
            route_planning = router.has_route_planner(),
            classifier = classifier.has_model(),
            "Services wired"
        );
        Ok(Self::new(router, classifier))
    }
}

#[cfg(test)]
mod tests {
    use infrastructure::{ClassifierAppConfig, MapsAppConfig};

    use super::*;

    #[test]
    fn optional_features_follow_config() {
        let state = AppState::from_config(&AppConfig::for_testing()).unwrap();
        assert!(!state.router.has_route_planner());
        assert!(!state.classifier.has_model());

        let config = AppConfig {
            maps: Some(MapsAppConfig::for_testing("http://localhost:1")),
            classifier: Some(ClassifierAppConfig::for_testing("http://localhost:1")),
            ..AppConfig::for_testing()
        };
        let state = AppState::from_config(&config).unwrap();
        assert!(state.router.has_route_planner());
        assert!(state.classifier.has_model());
    }

    #[test]
    fn keyless_sections_stay_off() {
        let config = AppConfig {
            maps: Some(MapsAppConfig::default()),
            ..AppConfig::for_testing()
        };
        let state = AppState::from_config(&config).unwrap();
        assert!(!state.router.has_route_planner());
    }
}
