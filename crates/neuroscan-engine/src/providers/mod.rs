mod dryrun;
mod gemini;

use std::collections::BTreeMap;
use std::sync::Arc;

use neuroscan_contracts::analysis::Assessment;
use neuroscan_contracts::conversation::ChatTurn;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::upload::ImagePayload;

pub use dryrun::DryrunClient;
pub use gemini::{
    chat_system_instruction, GeminiClient, CLASSIFICATION_PROMPT, NO_CONTEXT_SENTINEL,
};

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("GEMINI_API_KEY, GOOGLE_API_KEY or API_KEY not set")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("no response from model")]
    NoResponse,

    #[error("model returned malformed JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("model response failed schema validation: {0}")]
    Schema(#[source] serde_json::Error),
}

/// The remote image classifier.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &ImagePayload) -> Result<Assessment, RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Transcript before the new message, oldest first.
    pub history: Vec<ChatTurn>,
    pub message: String,
    /// Serialized diagnostic context, or [`NO_CONTEXT_SENTINEL`].
    pub context: String,
}

/// The remote conversational model. `Ok(None)` means the model answered
/// with no text.
pub trait ChatService: Send + Sync {
    fn reply(&self, request: &ChatRequest) -> Result<Option<String>, RemoteError>;
}

/// Parses the classifier's reply text into an [`Assessment`], separating
/// "not JSON at all" from "JSON of the wrong shape".
pub fn parse_assessment(text: &str) -> Result<Assessment, RemoteError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RemoteError::NoResponse);
    }
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(RemoteError::MalformedJson)?;
    serde_json::from_value(value).map_err(RemoteError::Schema)
}

/// One named backend exposing both remote services.
#[derive(Clone)]
pub struct Provider {
    name: String,
    pub classifier: Arc<dyn Classifier>,
    pub chat: Arc<dyn ChatService>,
}

impl Provider {
    pub fn new<P>(name: impl Into<String>, backend: P) -> Self
    where
        P: Classifier + ChatService + 'static,
    {
        let shared = Arc::new(backend);
        Self {
            name: name.into(),
            classifier: shared.clone(),
            chat: shared,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Provider) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Provider> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

pub fn default_provider_registry(config: &EngineConfig) -> ProviderRegistry {
    let mut providers = ProviderRegistry::new();
    providers.register(Provider::new("dryrun", DryrunClient));
    providers.register(Provider::new("gemini", GeminiClient::new(config)));
    providers
}

/// Flattens an error and its causes into one line for logging.
pub fn error_chain_text(err: &(dyn std::error::Error + 'static), max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(String::as_str) != Some(trimmed) {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use neuroscan_contracts::analysis::{Diagnosis, Severity};
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{default_provider_registry, error_chain_text, parse_assessment, RemoteError};
    use crate::config::EngineConfig;

    #[test]
    fn parse_assessment_accepts_schema_valid_json() -> anyhow::Result<()> {
        let assessment = parse_assessment(
            r#"{"diagnosis":"Pneumonia","confidence":88,"severity":"High",
                "findings":["Right lower lobe consolidation"],
                "recommendation":"Follow up with pulmonologist."}"#,
        )?;
        assert_eq!(assessment.diagnosis, Diagnosis::Pneumonia);
        assert_eq!(assessment.confidence.value(), 88.0);
        assert_eq!(assessment.severity, Severity::High);
        assert_eq!(assessment.findings, vec!["Right lower lobe consolidation"]);
        Ok(())
    }

    #[test]
    fn parse_assessment_classifies_failures() {
        assert!(matches!(parse_assessment("  "), Err(RemoteError::NoResponse)));
        assert!(matches!(
            parse_assessment("Pneumonia, 88%"),
            Err(RemoteError::MalformedJson(_))
        ));
        assert!(matches!(
            parse_assessment(r#"{"diagnosis":"Pneumonia","confidence":88}"#),
            Err(RemoteError::Schema(_))
        ));
        assert!(matches!(
            parse_assessment(
                r#"{"diagnosis":"Normal","confidence":140,"severity":"Low",
                    "findings":[],"recommendation":""}"#
            ),
            Err(RemoteError::Schema(_))
        ));
    }

    #[test]
    fn default_registry_includes_dryrun_and_gemini() {
        let config = EngineConfig {
            data_dir: PathBuf::from("/tmp/neuroscan"),
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://example.test/v1beta".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
            enhancement_delay: Duration::ZERO,
        };
        let registry = default_provider_registry(&config);
        assert_eq!(registry.names(), vec!["dryrun", "gemini"]);
        assert!(registry.get("gemini").is_some());
        assert!(registry.get("openai").is_none());
    }

    #[test]
    fn error_chain_text_includes_sources() {
        let inner = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RemoteError::MalformedJson(inner);
        let rendered = error_chain_text(&err, 400);
        assert!(rendered.starts_with("model returned malformed JSON"));
        assert!(rendered.contains("caused by"));
    }
}
