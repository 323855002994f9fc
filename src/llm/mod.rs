//! The external generation service seam.
//!
//! Everything that talks to a model goes through [`GenerationService`]. The
//! production implementation is [`GeminiService`]; [`ScriptedService`] replays
//! canned responses for tests and offline runs.

mod gemini;
mod scripted;

pub use gemini::{GeminiService, DEFAULT_BASE_URL};
pub use scripted::ScriptedService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failures talking to the generation service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation service timed out")]
    Timeout,

    #[error("Generation service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Generation service returned an empty response")]
    EmptyResponse,
}

/// One completion request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// The user-turn instruction.
    pub instruction: String,
    /// Optional system-level instruction.
    pub system: Option<String>,
    /// When set, the service is asked for JSON matching this JSON Schema.
    pub response_schema: Option<serde_json::Value>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn text(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Default::default()
        }
    }

    pub fn json(instruction: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            instruction: instruction.into(),
            response_schema: Some(schema),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn expects_json(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// A remote text/JSON completion API, treated as an opaque oracle.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Returns the raw response text. An empty body is an error.
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}
