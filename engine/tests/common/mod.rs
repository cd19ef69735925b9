//! Shared fixtures for the agent and driver integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use genesis_engine::agent::{Agent, Conversation, TaskState, TaskStateStore};
use genesis_engine::events::{EventSink, MemorySink};
use genesis_engine::llm::router::{LLMRouter, TierPreferences};
use genesis_engine::llm::{LLMError, LLMProvider, Message, ProviderReply, Result, TokenUsage};

pub const SYSTEM_PROMPT: &str = "You are a test agent.";

/// Provider that answers from a fixed script; `None` entries fail the call
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Option<String>>>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Option<&str>>) -> (Self, Arc<Mutex<Vec<Vec<Message>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|entry| entry.map(str::to_string))
                    .collect(),
            ),
            seen: Arc::clone(&seen),
        };
        (provider, seen)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, messages: &[Message]) -> Result<ProviderReply> {
        self.seen.lock().unwrap().push(messages.to_vec());
        match self.script.lock().unwrap().pop_front() {
            Some(Some(text)) => Ok(ProviderReply::new(
                text,
                "scripted",
                TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            )),
            Some(None) => Err(LLMError::ProviderUnavailable(
                "connection refused".to_string(),
            )),
            None => Err(LLMError::ProviderUnavailable("script exhausted".to_string())),
        }
    }
}

/// Everything a test needs to drive and inspect one agent
pub struct Harness {
    pub agent: Agent,
    pub sink: Arc<MemorySink>,
    pub seen: Arc<Mutex<Vec<Vec<Message>>>>,
    pub store: TaskStateStore,
}

/// Build an agent whose only provider plays `script`
pub fn harness(
    script: Vec<Option<&str>>,
    state_path: &std::path::Path,
    state: TaskState,
) -> Harness {
    let (provider, seen) = ScriptedProvider::new(script);
    let sink = Arc::new(MemorySink::new());
    let events = Arc::clone(&sink) as Arc<dyn EventSink>;

    let router = Arc::new(LLMRouter::new(
        Vec::new(),
        Box::new(provider),
        TierPreferences::default(),
        Arc::clone(&events),
    ));

    let agent = Agent::new(
        router,
        events,
        Conversation::new(SYSTEM_PROMPT),
        state,
        TaskStateStore::new(state_path),
    );

    Harness {
        agent,
        sink,
        seen,
        store: TaskStateStore::new(state_path),
    }
}
