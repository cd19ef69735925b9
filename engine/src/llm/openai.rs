//! OpenAI-compatible chat completions provider
//!
//! Serves both OpenAI and DeepSeek, which speak the same wire format. JSON
//! mode is requested so the model answers with a bare decision object.

use super::{LLMError, LLMProvider, Message, ProviderReply, TokenUsage};
use crate::config::ProviderEndpoint;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct OpenAICompatProvider {
    name: String,
    config: ProviderEndpoint,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(name: impl Into<String>, config: ProviderEndpoint, api_key: SecretString) -> Self {
        Self {
            name: name.into(),
            config,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// OpenAI proper
    pub fn openai(config: ProviderEndpoint, api_key: SecretString) -> Self {
        Self::new("openai", config, api_key)
    }

    /// DeepSeek's OpenAI-compatible endpoint
    pub fn deepseek(config: ProviderEndpoint, api_key: SecretString) -> Self {
        Self::new("deepseek", config, api_key)
    }

    fn build_payload(&self, messages: &[Message]) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        json!({
            "model": self.config.model,
            "messages": api_messages,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<ProviderReply> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = self.build_payload(messages);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.api_key.bearer())
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

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let content = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))?;

        let usage = TokenUsage {
            input_tokens: data["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: data["usage"]["completion_tokens"].as_u64().unwrap_or(0),
        };

        let model = data
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(&self.config.model);

        Ok(ProviderReply::new(content, model, usage))
    }
}
