//! A deterministic [`GenerationService`] that replays queued responses.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{GenerationRequest, GenerationService, LlmError};

/// Replays responses in FIFO order and records every request it receives.
///
/// Clones share the same queue and request log, so a test can keep a handle
/// while the pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedService {
    responses: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful raw response.
    pub fn push(&self, raw: impl Into<String>) -> &Self {
        self.queue(Ok(raw.into()))
    }

    /// Queue a JSON response.
    pub fn push_json(&self, value: serde_json::Value) -> &Self {
        self.queue(Ok(value.to_string()))
    }

    /// Queue a failure.
    pub fn push_err(&self, error: LlmError) -> &Self {
        self.queue(Err(error))
    }

    fn queue(&self, item: Result<String, LlmError>) -> &Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(item);
        }
        self
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Snapshot of the requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Responses queued but not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());
        next.unwrap_or_else(|| {
            Err(LlmError::Api {
                status: 503,
                message: "no scripted response queued".to_string(),
            })
        })
    }
}
