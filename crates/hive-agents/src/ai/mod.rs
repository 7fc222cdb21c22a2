//! AI model integration
//!
//! The language model is an external collaborator: given a prompt it returns
//! generated text and a token count. Providers implement [`AiProvider`].

mod provider;

pub use provider::*;

use serde::{Deserialize, Serialize};

/// Default OpenAI-compatible endpoint (Groq)
pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model for code generation
pub const DEFAULT_CODEX_MODEL: &str = "codellama-70b";

/// Default model for security analysis
pub const DEFAULT_DEBUG_MODEL: &str = "claude-3-haiku";

/// Chat message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: system, user, assistant
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// AI completion request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt (omitted when empty)
    pub system_prompt: String,

    /// Conversation history
    pub messages: Vec<ChatMessage>,

    /// Temperature
    pub temperature: f32,

    /// Max tokens
    pub max_tokens: u32,

    /// Model override; the provider's own model when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CompletionRequest {
    /// Single user prompt with default sampling
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system_prompt: String::new(),
            messages: vec![ChatMessage::user(text)],
            temperature: 0.2,
            max_tokens: 1024,
            model: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Security analysis prompt for Solidity source
    pub fn security_audit(source: &str) -> Self {
        Self::prompt(format!("Analyze Solidity security vulnerabilities:\n{}", source))
    }

    /// Code generation from a natural-language description
    pub fn generate_code(description: &str, language: &str) -> Self {
        Self::prompt(description).with_system_prompt(format!(
            "You are an expert {} developer. Generate clean, secure, and efficient code.",
            language
        ))
    }

    /// Test generation for existing source
    pub fn generate_tests(source: &str, language: &str) -> Self {
        Self::prompt(source).with_system_prompt(format!(
            "You are an expert in writing tests for {} code. Generate comprehensive test cases \
             using {} for the following code. Include tests for both normal operation and \
             edge cases.",
            language,
            test_framework(language)
        ))
    }
}

/// Test framework targeted by generated tests
pub fn test_framework(language: &str) -> &'static str {
    if language.eq_ignore_ascii_case("solidity") {
        "Hardhat"
    } else {
        "pytest"
    }
}

/// AI completion response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    /// Tokens used
    pub tokens_used: u32,

    /// Model that generated the response
    pub model: String,

    /// Latency in milliseconds
    pub latency_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_audit_prompt() {
        let request = CompletionRequest::security_audit("contract A {}");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(
            request.messages[0].content,
            "Analyze Solidity security vulnerabilities:\ncontract A {}"
        );
        assert!(request.system_prompt.is_empty());
        assert_eq!(request.model, None);
    }

    #[test]
    fn test_generation_prompts() {
        let code = CompletionRequest::generate_code("an ERC20 token", "solidity")
            .with_model(DEFAULT_CODEX_MODEL);
        assert_eq!(code.messages[0].content, "an ERC20 token");
        assert!(code.system_prompt.starts_with("You are an expert solidity developer."));
        assert_eq!(code.model.as_deref(), Some(DEFAULT_CODEX_MODEL));

        let tests = CompletionRequest::generate_tests("contract A {}", "Solidity");
        assert_eq!(tests.messages[0].content, "contract A {}");
        assert!(tests.system_prompt.contains("using Hardhat"));
        assert!(CompletionRequest::generate_tests("def f(): pass", "python")
            .system_prompt
            .contains("using pytest"));
    }
}
