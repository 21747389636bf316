//! LLM Call primitive.
//!
//! A single request/response against an [`LlmBackend`]. Chains and the
//! assistant build every model call through this type.

use crate::backend::{LlmBackend, LlmMessage, LlmRequest, TokenUsage};
use crate::config::ModelConfig;
use crate::error::LlmError;
use chainlab_conversation::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// The result of an LLM Call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallResult {
    /// The raw text output.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// An LLM Call executor.
///
/// This is a builder for a single model call.
#[derive(Debug, Clone)]
pub struct LlmCall {
    prompt: String,
    system: Option<String>,
    history: Vec<LlmMessage>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LlmCall {
    /// Creates a new LLM call for the given prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            history: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Adds prior turns, oldest first.
    #[must_use]
    pub fn with_history(mut self, turns: &[Turn]) -> Self {
        self.history = turns.iter().map(LlmMessage::from).collect();
        self
    }

    /// Applies the sampling settings of a model configuration.
    #[must_use]
    pub fn with_model(mut self, model: &ModelConfig) -> Self {
        self.temperature = Some(model.temperature);
        self.max_tokens = Some(model.max_tokens);
        self
    }

    /// Builds the LLM request.
    #[must_use]
    pub fn build_request(&self) -> LlmRequest {
        let mut request = LlmRequest::new(&self.prompt).with_context(self.history.clone());

        if let Some(system) = &self.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        request
    }

    /// Executes the call against a backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged.
    pub async fn execute(&self, backend: &dyn LlmBackend) -> Result<LlmCallResult, LlmError> {
        let request = self.build_request();
        let started = Instant::now();
        let response = backend.generate(&request).await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(
            model = %response.model,
            latency_ms,
            context_turns = request.context.len(),
            "LLM call completed"
        );

        Ok(LlmCallResult {
            content: response.content,
            usage: response.usage,
            model: response.model,
            timestamp: Utc::now(),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmResponse;
    use async_trait::async_trait;
    use chainlab_conversation::Role;
    use std::sync::Mutex;

    struct EchoBackend {
        seen: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(LlmResponse::text("echo", format!("echo: {}", request.prompt)))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Timeout)
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn build_request_carries_settings() {
        let model = ModelConfig::default();
        let history = vec![Turn::user("My name is Alice."), Turn::assistant("Hi Alice!")];
        let request = LlmCall::new("What is my name?")
            .with_system("You remember everything.")
            .with_history(&history)
            .with_model(&model)
            .build_request();

        assert_eq!(request.prompt, "What is my name?");
        assert_eq!(request.system.as_deref(), Some("You remember everything."));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(2000));
        assert_eq!(request.context.len(), 2);
        assert_eq!(request.context[0].role, Role::User);
        assert_eq!(request.context[1].content, "Hi Alice!");
    }

    #[test]
    fn bare_call_has_no_settings() {
        let request = LlmCall::new("Hello").build_request();
        assert!(request.system.is_none());
        assert!(request.temperature.is_none());
        assert!(request.context.is_empty());
    }

    #[tokio::test]
    async fn execute_returns_backend_text() {
        let backend = EchoBackend {
            seen: Mutex::new(Vec::new()),
        };
        let result = LlmCall::new("ping").execute(&backend).await.unwrap();

        assert_eq!(result.content, "echo: ping");
        assert_eq!(result.model, "echo");
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn execute_propagates_backend_error() {
        let err = LlmCall::new("ping").execute(&FailingBackend).await.unwrap_err();
        assert_eq!(err, LlmError::Timeout);
    }
}
