pub mod anthropic;
pub mod ollama;
pub mod prompts;

use async_trait::async_trait;

use crate::models::ChatMessage;

/// Free-form text generation. Output is not deterministic and may fail; the
/// booking flow always has a fallback reply.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, system_prompt: &str, messages: &[ChatMessage]) -> anyhow::Result<String>;
}
