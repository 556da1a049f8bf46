//! Completion-API client for the job handlers.
//!
//! The dispatch layer treats the LLM as an opaque, potentially slow,
//! potentially failing remote call: prompt in, text out. [`CompletionClient`]
//! is the seam; [`OpenAiCompatClient`] is the production implementation and
//! tests substitute their own.

mod error;
mod openai;

pub use error::LlmError;
pub use openai::{GROQ_BASE_URL, OpenAiCompatClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message role in a chat completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        CompletionRequest {
            model: model.into(),
            messages,
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// The completion-API seam the handlers are built on.
///
/// No timeout is imposed here; the caller's end-to-end wait bounds latency
/// (a hung call stalls one worker loop, by accepted design).
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Runs one chat completion and returns the generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::system("be helpful");
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire["role"], "system");
        assert_eq!(wire["content"], "be helpful");
    }

    #[test]
    fn request_builder_overrides_defaults() {
        let req = CompletionRequest::new("llama-3.1-8b-instant", vec![ChatMessage::user("hi")])
            .with_max_tokens(300)
            .with_temperature(0.0);
        assert_eq!(req.max_tokens, 300);
        assert_eq!(req.temperature, 0.0);
    }
}
