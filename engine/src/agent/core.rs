//! Agent Core
//!
//! The agent owns the conversation and the persisted task state. One call to
//! [`Agent::chat`] is one turn:
//!
//! 1. Append the input as a user message
//! 2. Route the conversation (tool output → FAST, anything else → SMART)
//! 3. Append the raw response as an assistant message
//! 4. Fold the parsed decision into the task state and persist it
//! 5. Return the raw response text
//!
//! A failure of the whole provider chain never escapes: the agent persists
//! its state and answers with a synthetic "brain error" reply instead.

use chrono::Utc;
use sdk::errors::EngineError;
use sdk::InputOrigin;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::events::{EventKind, EventSink};
use crate::llm::router::{LLMRouter, RoutingTier};

use super::conversation::Conversation;
use super::decision::parse_decision;
use super::task_state::{TaskState, TaskStateStore};

/// Reply returned when every provider failed
pub const BRAIN_ERROR_REPLY: &str =
    r#"{"thought":"LLM error","reply":"I encountered a brain error. Retrying..."}"#;

const BASE_DIRECTIVE: &str = r#"You are Genesis, an autonomous software engineer working from a shell.

You complete whatever task the user gives you. Work in a loop: plan, act with
a tool, observe the result, adapt, and repeat until the task is done.

PRINCIPLES:
1. Quality first. The result must work; investigate failures instead of guessing.
2. Tokens are expensive, local CPU is cheap. Filter and summarize data with
   shell tools before reading it.
3. Be fast, but never at the expense of the first two.

ENVIRONMENT:
- Your workspace is the current directory of run_command; relative paths
  given to file tools resolve there.
- Paths starting with src/ refer to your own code. After changing it, call
  restart so the change takes effect.
- Your task progress is saved after every turn and survives restarts.

RESPONSE FORMAT:
Answer with exactly one JSON object and nothing else.
To use a tool:
{"thought": "your reasoning", "action": {"tool": "run_command", "args": ["ls -la"]}}
To talk to the user (this ends your turn):
{"thought": "your reasoning", "reply": "your message"}
When the task is finished, say so in the reply (for example "Task completed.")."#;

/// Build the system directive for a tool list
pub fn build_system_prompt(tools_section: &str) -> String {
    format!("{}\n\n{}", BASE_DIRECTIVE, tools_section)
}

/// Conversation-owning agent bound to one router
pub struct Agent {
    router: Arc<LLMRouter>,
    events: Arc<dyn EventSink>,
    conversation: Conversation,
    state: TaskState,
    store: TaskStateStore,
    /// Human input whose response could not be parsed yet
    pending_input: Option<String>,
}

impl Agent {
    /// Create an agent from already-loaded parts
    pub fn new(
        router: Arc<LLMRouter>,
        events: Arc<dyn EventSink>,
        conversation: Conversation,
        state: TaskState,
        store: TaskStateStore,
    ) -> Self {
        Self {
            router,
            events,
            conversation,
            state,
            store,
            pending_input: None,
        }
    }

    /// Create an agent, loading task state from `store`
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` when the pruning limits are invalid.
    pub async fn open(
        router: Arc<LLMRouter>,
        events: Arc<dyn EventSink>,
        system_prompt: String,
        store: TaskStateStore,
        history_ceiling: usize,
        history_tail: usize,
    ) -> Result<Self, EngineError> {
        let conversation = Conversation::with_limits(system_prompt, history_ceiling, history_tail)?;
        let state = store.load().await;
        debug!(
            "Loaded task state ({}) from {}",
            state.status,
            store.path().display()
        );

        Ok(Self::new(router, events, conversation, state, store))
    }

    /// Run one turn and return the raw response text
    ///
    /// The origin is taken from the tool output marker; use
    /// [`Agent::chat_from`] for input the caller produced itself.
    pub async fn chat(&mut self, input: &str) -> String {
        self.chat_from(input, InputOrigin::of(input)).await
    }

    /// Run one turn for input of a known origin
    ///
    /// A correction carries on the human input it follows, so the task still
    /// starts from what the user asked for.
    pub async fn chat_from(&mut self, input: &str, origin: InputOrigin) -> String {
        if origin.is_user() {
            self.events.log(EventKind::User, input, None).await;
        }

        self.conversation.push_user(input);
        let tier = RoutingTier::for_input(input);

        let routed = match self.router.chat(self.conversation.messages(), tier).await {
            Ok(routed) => routed,
            Err(e) => {
                error!("LLM error: {}", e);
                self.events
                    .log(EventKind::Error, &format!("LLM error: {}", e), None)
                    .await;
                self.state.touch(Utc::now());
                self.persist().await;
                return BRAIN_ERROR_REPLY.to_string();
            }
        };

        debug!("Turn answered by {} ({})", routed.provider, routed.model);
        self.conversation.push_assistant(routed.content.as_str());

        let decision = parse_decision(&routed.content);
        let fresh_input = match origin {
            InputOrigin::User => Some(input.to_string()),
            InputOrigin::Correction => self.pending_input.take(),
            InputOrigin::ToolOutput => None,
        };
        match &decision {
            Some(d) => {
                if let Some(thought) = &d.thought {
                    self.events.log(EventKind::Thought, thought, None).await;
                }
            }
            None => warn!("Response is not a valid decision object"),
        }

        self.state.record_turn(fresh_input.as_deref(), decision.as_ref(), Utc::now());
        self.pending_input = match decision {
            Some(_) => None,
            None => fresh_input,
        };
        self.persist().await;

        routed.content
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.state).await {
            error!("Failed to persist task state: {}", e);
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_lists_tools() {
        let prompt = build_system_prompt("TOOLS:\n- run_command(cmd): shell");
        assert!(prompt.starts_with("You are Genesis"));
        assert!(prompt.ends_with("- run_command(cmd): shell"));
        assert!(prompt.contains(r#""action": {"tool""#));
    }

    #[test]
    fn test_brain_error_reply_is_a_decision() {
        let decision = parse_decision(BRAIN_ERROR_REPLY).unwrap();
        assert_eq!(decision.thought.as_deref(), Some("LLM error"));
        assert_eq!(
            decision.reply.as_deref(),
            Some("I encountered a brain error. Retrying...")
        );
    }
}
