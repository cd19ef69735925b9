//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the upstream model-serving
//! endpoints (Anthropic, DeepSeek, OpenAI, Ollama). Each provider turns a
//! conversation into the raw response text; the router decides which one to
//! ask and cascades when one fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod router;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Short classification label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            LLMError::ProviderUnavailable(_) => "unavailable",
            LLMError::AuthenticationFailed(_) => "auth",
            LLMError::RateLimitExceeded => "rate_limit",
            LLMError::InvalidRequest(_) => "http_status",
            LLMError::NetworkError(_) => "network",
            LLMError::Timeout => "timeout",
            LLMError::ParseError(_) => "malformed_response",
        }
    }

    /// Map a non-2xx HTTP status to its classification
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed(body),
            429 => LLMError::RateLimitExceeded,
            _ => LLMError::InvalidRequest(format!("{}: {}", status, body)),
        }
    }

    /// Map a transport failure from reqwest
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_connect() {
            LLMError::ProviderUnavailable(e.to_string())
        } else {
            LLMError::NetworkError(e.to_string())
        }
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System directive (always the first message)
    System,

    /// User message, human text or tool output
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Raw text answer from a single provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderReply {
    /// Response text exactly as the model produced it
    pub content: String,

    /// Model that produced it
    pub model: String,

    /// Token usage, zero when the provider does not report it
    pub usage: TokenUsage,
}

impl ProviderReply {
    pub fn new(content: impl Into<String>, model: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage,
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "deepseek", "anthropic")
    fn name(&self) -> &str;

    /// Returns the model this provider is bound to
    fn model(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Generate a response from the LLM
    ///
    /// # Arguments
    /// * `messages` - Conversation history; the first message is the system directive
    ///
    /// # Returns
    /// * `Ok(ProviderReply)` - The unaltered response text plus usage
    /// * `Err(LLMError)` - Classified failure
    async fn generate(&self, messages: &[Message]) -> Result<ProviderReply>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}
