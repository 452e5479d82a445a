use std::time::Duration;

use neuroscan_contracts::analysis::{Assessment, Diagnosis, Severity};
use neuroscan_contracts::conversation::{ChatRole, ChatTurn};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};
use tracing::debug;

use super::{parse_assessment, truncate_text, ChatRequest, ChatService, Classifier, RemoteError};
use crate::config::EngineConfig;
use crate::upload::ImagePayload;

pub const CLASSIFICATION_PROMPT: &str = "You are an expert radiologist AI assistant named \"NeuroScan\".

Analyze the provided medical image (Chest X-Ray) with high precision.
1. Identify if this is a Chest X-ray. If not, mark diagnosis as \"Uncertain\".
2. Check for opacities, consolidations, infiltrates, pleural effusion, or masses.
3. Assess the overall lung clarity and cardiac silhouette.
4. Provide a confidence score (0-100) based on visual evidence.
5. Determine severity of any pathological findings.

Return the result strictly in JSON format matching the schema.";

pub const NO_CONTEXT_SENTINEL: &str = "No specific analysis context.";

pub fn chat_system_instruction(context: &str) -> String {
    format!(
        "You are Dr. Neuro, a helpful and empathetic AI medical assistant.
The user is asking about a specific X-ray analysis.
Context of the current analysis: {context}

Rules:
1. Explain medical terms in simple language.
2. Do NOT give definitive medical diagnoses or prescribe medication.
3. Always advise consulting a real doctor for final decisions.
4. Be concise and professional."
    )
}

pub struct GeminiClient {
    api_base: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: config.request_timeout,
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn response_schema() -> Value {
        let diagnoses: Vec<&str> = Diagnosis::ALL.iter().map(|value| value.as_str()).collect();
        let severities: Vec<&str> = Severity::ALL.iter().map(|value| value.as_str()).collect();
        json!({
            "type": "OBJECT",
            "properties": {
                "diagnosis": { "type": "STRING", "enum": diagnoses },
                "confidence": {
                    "type": "NUMBER",
                    "description": "Confidence percentage from 0 to 100",
                },
                "severity": { "type": "STRING", "enum": severities },
                "findings": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "List of specific visual findings (e.g., 'Right lower lobe consolidation')",
                },
                "recommendation": {
                    "type": "STRING",
                    "description": "Clinical recommendation based on findings",
                },
            },
            "required": ["diagnosis", "confidence", "findings", "severity", "recommendation"],
        })
    }

    fn classification_payload(image: &ImagePayload) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": image.data,
                        }
                    },
                    { "text": CLASSIFICATION_PROMPT },
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": Self::response_schema(),
            },
        })
    }

    fn chat_payload(request: &ChatRequest) -> Value {
        let mut contents: Vec<Value> = request.history.iter().map(turn_content).collect();
        contents.push(json!({
            "role": "user",
            "parts": [{ "text": request.message }],
        }));
        json!({
            "systemInstruction": {
                "parts": [{ "text": chat_system_instruction(&request.context) }],
            },
            "contents": contents,
        })
    }

    fn post(&self, payload: &Value) -> Result<Value, RemoteError> {
        let api_key = self.api_key.as_deref().ok_or(RemoteError::MissingApiKey)?;
        let endpoint = self.endpoint_for_model(&self.model);
        debug!(endpoint = %endpoint, "posting generateContent request");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(payload)
            .send()?;
        response_json_or_error(response)
    }

    /// Concatenated text parts of the first candidate, if any.
    fn extract_text(response_payload: &Value) -> Option<String> {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)?;
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl Classifier for GeminiClient {
    fn classify(&self, image: &ImagePayload) -> Result<Assessment, RemoteError> {
        let response_payload = self.post(&Self::classification_payload(image))?;
        let text = Self::extract_text(&response_payload).ok_or(RemoteError::NoResponse)?;
        parse_assessment(&text)
    }
}

impl ChatService for GeminiClient {
    fn reply(&self, request: &ChatRequest) -> Result<Option<String>, RemoteError> {
        let response_payload = self.post(&Self::chat_payload(request))?;
        Ok(Self::extract_text(&response_payload))
    }
}

fn turn_content(turn: &ChatTurn) -> Value {
    let role = match turn.role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    };
    json!({
        "role": role,
        "parts": [{ "text": turn.text }],
    })
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, RemoteError> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body: truncate_text(&body, 512),
        });
    }
    serde_json::from_str(&body).map_err(RemoteError::MalformedJson)
}
