//! Classifier port - Interface for the language model behind intent detection

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for text generation used to classify requests
///
/// The adapter only transports text; prompt construction and parsing of the
/// answer happen in [`crate::services::IntentClassifier`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClassifierPort: Send + Sync {
    /// Generate a completion for `message` under `system_prompt`
    async fn generate_with_system(
        &self,
        system_prompt: &str,
        message: &str,
    ) -> Result<String, ApplicationError>;

    /// Name of the backing model
    fn model_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ClassifierPort>();
    }
}
