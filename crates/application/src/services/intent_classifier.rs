//! Intent classification
//!
//! Short help requests are recognized locally. Everything else goes to the
//! language model behind [`ClassifierPort`], whose JSON answer is validated
//! field by field. Classification never fails: transport errors and
//! malformed answers both yield [`Intent::Unknown`].

use std::fmt;
use std::sync::Arc;

use domain::Intent;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::normalize::fold_diacritics;
use crate::ports::ClassifierPort;

/// System prompt for the language model
pub const INTENT_SYSTEM_PROMPT: &str = r#"Você é um classificador de intenções para um bot de ônibus de São Paulo.
Responda apenas com JSON válido (uma única linha), sem comentários.

INTENÇÕES:
- previsao: previsão em uma parada. Campos: parada (obrigatório), linha (opcional).
- posicao: posição da frota de uma linha. Campos: linha (obrigatório).
- linha: buscar linhas por termo/código. Campos: termo (obrigatório).
- rota: rota de ônibus entre dois lugares. Campos: origem (obrigatório), destino (obrigatório).
- ajuda: quando pedirem ajuda.
- desconhecido: se não der para decidir.

Exemplos:
"quando chega 701U-10 no ponto 340015345?" ->
{"type":"previsao","parada":"340015345","linha":"701U-10"}

"onde estao os onibus 477P?" ->
{"type":"posicao","linha":"477P"}

"qual onibus passa na paulista?" ->
{"type":"linha","termo":"paulista"}

"como chego da praca da se ate a avenida paulista?" ->
{"type":"rota","origem":"praca da se","destino":"avenida paulista"}"#;

/// A pattern recognized without the language model
struct QuickPattern {
    /// Whole-message keywords that trigger this pattern
    keywords: &'static [&'static str],
    /// Intent produced on a match
    intent: fn() -> Intent,
}

const QUICK_PATTERNS: &[QuickPattern] = &[QuickPattern {
    keywords: &["ajuda", "help", "menu", "comandos", "?", "oi", "ola"],
    intent: || Intent::Help,
}];

/// Raw classifier answer
#[derive(Debug, Deserialize)]
struct ParsedIntent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    parada: Value,
    #[serde(default)]
    linha: Value,
    #[serde(default)]
    termo: Value,
    #[serde(default)]
    origem: Value,
    #[serde(default)]
    destino: Value,
}

/// Non-blank text of a string or number field
fn field_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

impl ParsedIntent {
    fn into_intent(self) -> Intent {
        match self.kind.trim().to_lowercase().as_str() {
            "previsao" => field_text(&self.parada).map_or(Intent::Unknown, |stop| {
                Intent::Prediction {
                    stop,
                    line: field_text(&self.linha),
                }
            }),
            "posicao" => field_text(&self.linha).map_or(Intent::Unknown, |line| Intent::Position { line }),
            "linha" => field_text(&self.termo).map_or(Intent::Unknown, |term| Intent::LineSearch { term }),
            "rota" => match (field_text(&self.origem), field_text(&self.destino)) {
                (Some(origin), Some(destination)) => Intent::Route {
                    origin,
                    destination,
                },
                _ => Intent::Unknown,
            },
            "ajuda" => Intent::Help,
            _ => Intent::Unknown,
        }
    }
}

/// Classifies free text into an [`Intent`]
#[derive(Clone, Default)]
pub struct IntentClassifier {
    model: Option<Arc<dyn ClassifierPort>>,
}

impl fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("model", &self.model.as_ref().map(|m| m.model_name()))
            .field("quick_patterns_count", &QUICK_PATTERNS.len())
            .finish()
    }
}

impl IntentClassifier {
    /// Classifier that only knows the quick patterns
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a language model for everything the quick patterns miss
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn ClassifierPort>) -> Self {
        self.model = Some(model);
        self
    }

    /// Whether a language model is configured
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Classify a message
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    pub async fn classify(&self, message: &str) -> Intent {
        let input = fold_diacritics(message).trim().to_string();
        if input.is_empty() {
            return Intent::Unknown;
        }

        if let Some(intent) = Self::parse_quick(&input) {
            debug!(intent = intent.kind(), "Quick pattern matched");
            return intent;
        }

        let Some(model) = &self.model else {
            debug!("No classifier model configured");
            return Intent::Unknown;
        };

        let response = match model
            .generate_with_system(INTENT_SYSTEM_PROMPT, &format!("Usuario: {input}"))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Classifier call failed");
                return Intent::Unknown;
            },
        };

        match Self::parse_response(&response) {
            Ok(intent) => {
                debug!(intent = intent.kind(), "Classified");
                intent
            },
            Err(e) => {
                warn!(error = %e, response = %response, "Failed to parse classifier response");
                Intent::Unknown
            },
        }
    }

    fn parse_quick(input: &str) -> Option<Intent> {
        let lower = input.to_lowercase();
        let word = lower.trim_end_matches(['!', '.']).trim();
        QUICK_PATTERNS
            .iter()
            .find(|p| p.keywords.contains(&word))
            .map(|p| (p.intent)())
    }

    fn parse_response(response: &str) -> Result<Intent, String> {
        let json = extract_json(response);
        let parsed: ParsedIntent =
            serde_json::from_str(json).map_err(|e| format!("JSON parse error: {e}"))?;
        Ok(parsed.into_intent())
    }
}

/// Extract JSON from a possibly markdown-wrapped response
pub fn extract_json(response: &str) -> &str {
    let response = response.trim();

    if let Some(start) = response.find("```json") {
        if let Some(end) = response[start + 7..].find("```") {
            return response[start + 7..start + 7 + end].trim();
        }
    }

    if let Some(start) = response.find("```") {
        if let Some(end) = response[start + 3..].find("```") {
            return response[start + 3..start + 3 + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if start <= end {
            return &response[start..=end];
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};

    use super::*;
    use crate::error::ApplicationError;
    use crate::ports::MockClassifierPort;

    fn model_answering(answer: &'static str) -> Arc<dyn ClassifierPort> {
        let mut mock = MockClassifierPort::new();
        mock.expect_generate_with_system()
            .returning(move |_, _| Ok(answer.to_string()));
        mock.expect_model_name().return_const("test-model".to_string());
        Arc::new(mock)
    }

    #[test]
    fn extract_json_from_fence() {
        let response = "Claro!\n```json\n{\"type\":\"ajuda\"}\n```";
        assert_eq!(extract_json(response), r#"{"type":"ajuda"}"#);
    }

    #[test]
    fn extract_json_from_plain_fence() {
        assert_eq!(extract_json("```\n{\"a\":1}\n```"), r#"{"a":1}"#);
    }

    #[test]
    fn extract_json_from_braces() {
        assert_eq!(extract_json("resposta: {\"a\":1} ok"), r#"{"a":1}"#);
    }

    #[test]
    fn extract_json_handles_reversed_braces() {
        assert_eq!(extract_json("} {"), "} {");
    }

    #[test]
    fn parse_prediction_with_numeric_stop() {
        let intent = IntentClassifier::parse_response(
            r#"{"type":"previsao","parada":340015345,"linha":"701U-10"}"#,
        )
        .unwrap();
        assert_eq!(
            intent,
            Intent::Prediction {
                stop: "340015345".to_string(),
                line: Some("701U-10".to_string())
            }
        );
    }

    #[test]
    fn parse_requires_mandatory_fields() {
        for response in [
            r#"{"type":"previsao"}"#,
            r#"{"type":"posicao","linha":""}"#,
            r#"{"type":"linha"}"#,
            r#"{"type":"rota","origem":"Se"}"#,
            r#"{"type":"desconhecido"}"#,
            r#"{"type":"voar"}"#,
        ] {
            assert_eq!(
                IntentClassifier::parse_response(response).unwrap(),
                Intent::Unknown,
                "{response}"
            );
        }
    }

    #[test]
    fn parse_other_intents() {
        assert_eq!(
            IntentClassifier::parse_response(r#"{"type":"posicao","linha":"477P"}"#).unwrap(),
            Intent::Position {
                line: "477P".to_string()
            }
        );
        assert_eq!(
            IntentClassifier::parse_response(r#"{"type":"linha","termo":"paulista"}"#).unwrap(),
            Intent::LineSearch {
                term: "paulista".to_string()
            }
        );
        assert_eq!(
            IntentClassifier::parse_response(r#"{"type":"rota","origem":"Se","destino":"Paulista"}"#)
                .unwrap(),
            Intent::Route {
                origin: "Se".to_string(),
                destination: "Paulista".to_string()
            }
        );
        assert_eq!(
            IntentClassifier::parse_response(r#"{"type":"ajuda"}"#).unwrap(),
            Intent::Help
        );
    }

    #[test]
    fn parse_garbage_is_error() {
        assert!(IntentClassifier::parse_response("não sei").is_err());
    }

    #[tokio::test]
    async fn quick_help_skips_model() {
        let mut mock = MockClassifierPort::new();
        mock.expect_generate_with_system().times(0);
        let classifier = IntentClassifier::new().with_model(Arc::new(mock));

        assert_eq!(classifier.classify("Ajuda!").await, Intent::Help);
        assert_eq!(classifier.classify("  olá ").await, Intent::Help);
        assert_eq!(classifier.classify("?").await, Intent::Help);
    }

    #[tokio::test]
    async fn model_receives_folded_input() {
        let mut mock = MockClassifierPort::new();
        mock.expect_generate_with_system()
            .with(always(), eq("Usuario: onde estao os onibus 477P?"))
            .times(1)
            .returning(|_, _| Ok(r#"{"type":"posicao","linha":"477P"}"#.to_string()));

        let classifier = IntentClassifier::new().with_model(Arc::new(mock));
        assert_eq!(
            classifier.classify("onde estão os ônibus 477P?").await,
            Intent::Position {
                line: "477P".to_string()
            }
        );
    }

    #[tokio::test]
    async fn fenced_answer_is_accepted() {
        let classifier = IntentClassifier::new().with_model(model_answering(
            "```json\n{\"type\":\"linha\",\"termo\":\"paulista\"}\n```",
        ));
        assert_eq!(
            classifier.classify("qual onibus passa na paulista?").await,
            Intent::LineSearch {
                term: "paulista".to_string()
            }
        );
    }

    #[tokio::test]
    async fn malformed_answer_is_unknown() {
        let classifier = IntentClassifier::new().with_model(model_answering("I think it's a bus"));
        assert_eq!(classifier.classify("blah blah").await, Intent::Unknown);
    }

    #[tokio::test]
    async fn model_failure_is_unknown() {
        let mut mock = MockClassifierPort::new();
        mock.expect_generate_with_system()
            .returning(|_, _| Err(ApplicationError::Classification("503".to_string())));
        let classifier = IntentClassifier::new().with_model(Arc::new(mock));

        assert_eq!(classifier.classify("quando chega o 701U?").await, Intent::Unknown);
    }

    #[tokio::test]
    async fn without_model_only_quick_patterns_work() {
        let classifier = IntentClassifier::new();
        assert!(!classifier.has_model());
        assert_eq!(classifier.classify("help").await, Intent::Help);
        assert_eq!(classifier.classify("onde esta o 477P").await, Intent::Unknown);
        assert_eq!(classifier.classify("   ").await, Intent::Unknown);
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn extract_json_never_panics(input in ".*") {
                let _ = extract_json(&input);
            }

            #[test]
            fn parse_response_never_panics(input in ".*") {
                let _ = IntentClassifier::parse_response(&input);
            }
        }
    }
}
