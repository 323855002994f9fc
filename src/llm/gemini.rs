//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{GenerationRequest, GenerationService, LlmError};

/// Default API root for the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider authenticated with an API key.
#[derive(Debug, Clone)]
pub struct GeminiService {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_body(request: &GenerationRequest) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.instruction }]
            }]
        });

        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let mut gen_config = serde_json::Map::new();
        if let Some(temp) = request.temperature {
            gen_config.insert("temperature".to_string(), json!(temp));
        }
        if let Some(schema) = &request.response_schema {
            gen_config.insert("responseMimeType".to_string(), json!("application/json"));
            gen_config.insert("responseJsonSchema".to_string(), strip_meta(schema.clone()));
        }
        if !gen_config.is_empty() {
            body["generationConfig"] = Value::Object(gen_config);
        }

        body
    }

    /// Concatenates the text parts of the first candidate.
    fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["content"]["parts"].as_array())?;

        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        Some(text)
    }
}

/// The API rejects the `$schema` meta keyword, so it is removed before sending.
fn strip_meta(mut schema: Value) -> Value {
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    schema
}

#[async_trait]
impl GenerationService for GeminiService {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let body = Self::build_body(&request);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout } else { LlmError::Http(e) })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!("Gemini returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout } else { LlmError::Http(e) })?;

        tracing::debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "Gemini call completed"
        );

        match Self::extract_text(&json) {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyResponse),
        }
    }
}
