//! Conversation history for the agent loop
//!
//! Messages are stored in order: the system directive at index 0, then
//! alternating user input (human text or tool output) and assistant
//! responses. When the history grows past the ceiling it is cut back to the
//! system directive plus the most recent `tail` messages.

use crate::llm::Message;
use sdk::errors::EngineError;

/// Default history length that triggers pruning
pub const DEFAULT_CEILING: usize = 100;

/// Default number of recent messages kept after pruning
pub const DEFAULT_TAIL: usize = 50;

/// Bounded conversation whose first message is always the system directive
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    ceiling: usize,
    tail: usize,
}

impl Conversation {
    /// Create a conversation with the default 100/50 pruning policy
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            ceiling: DEFAULT_CEILING,
            tail: DEFAULT_TAIL,
        }
    }

    /// Create a conversation with a custom pruning policy
    ///
    /// Requires `1 <= tail < ceiling`.
    pub fn with_limits(
        system_prompt: impl Into<String>,
        ceiling: usize,
        tail: usize,
    ) -> Result<Self, EngineError> {
        if tail == 0 || tail >= ceiling {
            return Err(EngineError::Config(format!(
                "history tail ({}) must be at least 1 and below the ceiling ({})",
                tail, ceiling
            )));
        }

        Ok(Self {
            messages: vec![Message::system(system_prompt)],
            ceiling,
            tail,
        })
    }

    /// Append a user message (human text or tool output)
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
        self.prune();
    }

    /// Append an assistant response
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
        self.prune();
    }

    /// All messages, system directive first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true: the system directive is always present
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the system directive
    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// Most recent user message, if any
    pub fn last_user(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::llm::MessageRole::User)
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Keep `[system] + last tail` once the history exceeds the ceiling
    fn prune(&mut self) {
        let len = self.messages.len();
        if len > self.ceiling {
            self.messages.drain(1..len - self.tail);
            tracing::debug!(
                "Pruned conversation from {} to {} messages",
                len,
                self.messages.len()
            );
        }
    }
}
