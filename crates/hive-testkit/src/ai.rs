//! Scripted AI provider

use async_trait::async_trait;
use hive_agents::ai::{AiProvider, CompletionRequest, CompletionResponse};
use hive_agents::AiError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Provider answering from a queue of canned replies
///
/// When the queue is empty the last reply is repeated; with no replies at
/// all every call fails with [`AiError::Unavailable`].
pub struct ScriptedAiProvider {
    replies: Mutex<VecDeque<Result<String, AiError>>>,
    last: Mutex<Option<Result<String, AiError>>>,
    prompts: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedAiProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Provider that always answers `text`
    pub fn answering(text: &str) -> Self {
        Self::new().then_reply(text)
    }

    /// Provider whose every call fails
    pub fn failing(error: AiError) -> Self {
        let provider = Self::new();
        provider.replies.lock().push_back(Err(error));
        provider
    }

    pub fn then_reply(self, text: &str) -> Self {
        self.replies.lock().push_back(Ok(text.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests seen so far
    pub fn prompts(&self) -> Vec<CompletionRequest> {
        self.prompts.lock().clone()
    }
}

impl Default for ScriptedAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for ScriptedAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = request.model.clone().unwrap_or_else(|| "scripted".to_string());
        self.prompts.lock().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = {
            let mut replies = self.replies.lock();
            let mut last = self.last.lock();
            match replies.pop_front() {
                Some(reply) => {
                    *last = Some(reply.clone());
                    reply
                }
                None => last
                    .clone()
                    .unwrap_or_else(|| Err(AiError::Unavailable("no scripted reply".to_string()))),
            }
        };

        let content = next?;
        Ok(CompletionResponse {
            tokens_used: content.split_whitespace().count() as u32,
            content,
            model,
            latency_ms: self.delay.as_millis() as u64,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
