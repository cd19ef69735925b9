use super::{LLMError, LLMProvider, Message, MessageRole, ProviderReply, TokenUsage};
use crate::config::ProviderEndpoint;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

pub struct AnthropicProvider {
    config: ProviderEndpoint,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: ProviderEndpoint, api_key: SecretString) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Split the conversation into the `system` parameter and the ordered turns.
    ///
    /// Only the leading system message becomes the system parameter. The
    /// Messages API requires the first turn to be a user turn, so assistant
    /// turns left at the front by history pruning are skipped.
    fn build_payload(&self, messages: &[Message]) -> Value {
        let (system_prompt, turns) = match messages.split_first() {
            Some((first, rest)) if first.role == MessageRole::System => {
                (first.content.as_str(), rest)
            }
            _ => ("", messages),
        };

        let api_messages: Vec<Value> = turns
            .iter()
            .skip_while(|msg| msg.role == MessageRole::Assistant)
            .map(|msg| {
                json!({
                    "role": if msg.role == MessageRole::Assistant { "assistant" } else { "user" },
                    "content": msg.content
                })
            })
            .collect();

        json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt,
            "messages": api_messages,
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<ProviderReply> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let payload = self.build_payload(messages);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(LLMError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, text));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content_arr = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMError::ParseError("No content array in response".to_string()))?;

        let mut full_content = String::new();
        for item in content_arr {
            if let Some(text) = item.get("text").and_then(|t| t.as_str()) {
                full_content.push_str(text);
            }
        }

        if full_content.is_empty() {
            return Err(LLMError::ParseError(
                "No text block in response".to_string(),
            ));
        }

        let usage = TokenUsage {
            input_tokens: data["usage"]["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: data["usage"]["output_tokens"].as_u64().unwrap_or(0),
        };

        let model = data
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(&self.config.model);

        Ok(ProviderReply::new(full_content, model, usage))
    }
}
