//! AI provider implementations

use super::{CompletionRequest, CompletionResponse, DEFAULT_CHAT_ENDPOINT};
use crate::error::AiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// AI provider trait
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError>;

    /// Check if provider is available
    async fn is_available(&self) -> bool;

    /// Get provider name
    fn name(&self) -> &str;

    /// Generate `language` source from a description using `model`
    async fn generate_code(
        &self,
        model: &str,
        description: &str,
        language: &str,
    ) -> Result<CompletionResponse, AiError> {
        let request = CompletionRequest::generate_code(description, language).with_model(model);
        self.complete(request).await
    }

    /// Generate tests for `source` using `model`
    async fn generate_tests(
        &self,
        model: &str,
        source: &str,
        language: &str,
    ) -> Result<CompletionResponse, AiError> {
        let request = CompletionRequest::generate_tests(source, language).with_model(model);
        self.complete(request).await
    }
}

/// OpenAI-compatible chat completions provider (Groq, OpenAI, local gateways)
pub struct ChatCompletionsProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Request(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// Provider against the default Groq endpoint
    pub fn groq(api_key: &str, model: &str) -> Result<Self, AiError> {
        Self::new(DEFAULT_CHAT_ENDPOINT, api_key, model, Duration::from_secs(60))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequestMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[async_trait]
impl AiProvider for ChatCompletionsProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::Unavailable("API key not set".to_string()));
        }
        let start = Instant::now();
        let model = request.model.unwrap_or_else(|| self.model.clone());

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system_prompt.is_empty() {
            messages.push(ChatRequestMessage {
                role: "system".to_string(),
                content: request.system_prompt,
            });
        }
        for msg in request.messages {
            messages.push(ChatRequestMessage {
                role: msg.role,
                content: msg.content,
            });
        }

        let chat_request = ChatRequest {
            model: model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        let tokens_used = chat_response.usage.map(|u| u.total_tokens).unwrap_or(0);

        tracing::debug!(model = %model, tokens_used, "completion received");
        Ok(CompletionResponse {
            content,
            tokens_used,
            model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}
