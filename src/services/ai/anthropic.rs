use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::LlmProvider;
use crate::models::ChatMessage;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(&self, system_prompt: &str, messages: &[ChatMessage]) -> anyhow::Result<String> {
        // The Messages API takes the system prompt separately and rejects an
        // assistant turn in first position.
        let turns: Vec<serde_json::Value> = messages
            .iter()
            .skip_while(|m| m.role != crate::models::Role::User)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let body = json!({
            "model": self.model,
            "system": system_prompt,
            "messages": turns,
            "max_tokens": MAX_TOKENS,
            "temperature": 0.7,
        });

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("failed to call Anthropic API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Anthropic response")?;

        if !status.is_success() {
            anyhow::bail!("Anthropic API error ({}): {}", status, data["error"]["message"]);
        }

        let text: String = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            anyhow::bail!("missing text content in Anthropic response");
        }
        Ok(text)
    }
}
