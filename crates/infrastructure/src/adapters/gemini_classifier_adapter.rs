//! Gemini classifier adapter - Implements ClassifierPort over the
//! Generative Language `generateContent` REST endpoint

use std::time::Duration;

use application::error::ApplicationError;
use application::ports::ClassifierPort;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::ClassifierAppConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Adapter for Google's Gemini models
pub struct GeminiClassifierAdapter {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl std::fmt::Debug for GeminiClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClassifierAdapter")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClassifierAdapter {
    /// Create a new adapter
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key is set or the HTTP client
    /// cannot be built.
    pub fn new(config: &ClassifierAppConfig) -> Result<Self, ApplicationError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|_| config.is_enabled())
            .ok_or_else(|| ApplicationError::Configuration("classifier.api_key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApplicationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn map_status(status: StatusCode, body: &str) -> ApplicationError {
        let excerpt: String = body.chars().take(200).collect();
        if status == StatusCode::TOO_MANY_REQUESTS {
            ApplicationError::ExternalService("Gemini rate limit exceeded".to_string())
        } else {
            ApplicationError::ExternalService(format!("Gemini returned {status}: {excerpt}"))
        }
    }
}

#[async_trait]
impl ClassifierPort for GeminiClassifierAdapter {
    #[instrument(skip(self, system_prompt, message), fields(model = %self.model, message_len = message.len()))]
    async fn generate_with_system(
        &self,
        system_prompt: &str,
        message: &str,
    ) -> Result<String, ApplicationError> {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part {
                    text: system_prompt,
                }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: message }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ApplicationError::ExternalService(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, &body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ApplicationError::Classification(format!("Invalid Gemini response: {e}")))?;

        let text = parsed
            .text()
            .ok_or_else(|| ApplicationError::Classification("Empty Gemini response".to_string()))?;

        debug!(response_len = text.len(), "Gemini answered");
        Ok(text)
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
