//! Decision loop driver
//!
//! Drives one human request to completion: chat, parse, then either stop on
//! a reply or run the requested tool and feed its output back. The loop is
//! bounded by the configured turn cap.

use sdk::{tool_output, ActionRequest, InputOrigin};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::events::{EventKind, EventSink};
use crate::tools::ToolRegistry;

use super::core::Agent;
use super::decision::parse_decision;

/// Input fed back after a response that was not a decision object
pub const INVALID_JSON_PROMPT: &str =
    "Error: Your last response was not valid JSON. Please respond with valid JSON only.";

/// Shown when a decision has neither reply, action nor thought
pub const FALLBACK_REPLY: &str = "I'm not sure how to respond.";

/// How a decision loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced something to show the user
    Reply(String),
    /// The turn cap was hit first
    CapReached(usize),
}

/// Progress callbacks for the presentation layer
///
/// Every method defaults to doing nothing.
pub trait TurnObserver: Send {
    fn on_thinking(&mut self, _turn: usize) {}
    fn on_thought(&mut self, _thought: &str) {}
    fn on_action(&mut self, _action: &ActionRequest) {}
    fn on_tool_result(&mut self, _tool: &str, _result: &str) {}
    fn on_reply(&mut self, _reply: &str) {}
    fn on_parse_error(&mut self, _raw: &str) {}
    fn on_cap_reached(&mut self, _max_turns: usize) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl TurnObserver for SilentObserver {}

pub struct Driver {
    tools: Arc<ToolRegistry>,
    max_turns: usize,
    events: Arc<dyn EventSink>,
}

impl Driver {
    pub fn new(tools: Arc<ToolRegistry>, max_turns: usize, events: Arc<dyn EventSink>) -> Self {
        Self {
            tools,
            max_turns,
            events,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Run the decision loop for one human input
    pub async fn run(
        &self,
        agent: &mut Agent,
        input: &str,
        observer: &mut dyn TurnObserver,
    ) -> TurnOutcome {
        let mut current_input = input.to_string();
        let mut origin = InputOrigin::of(input);

        for turn in 1..=self.max_turns {
            debug!("Decision loop turn {}/{}", turn, self.max_turns);
            observer.on_thinking(turn);

            let raw = agent.chat_from(&current_input, origin).await;

            let Some(decision) = parse_decision(&raw) else {
                warn!("Could not parse agent response as a decision");
                observer.on_parse_error(&raw);
                current_input = INVALID_JSON_PROMPT.to_string();
                origin = InputOrigin::Correction;
                continue;
            };

            if let Some(thought) = &decision.thought {
                observer.on_thought(thought);
            }

            if let Some(reply) = decision.reply {
                observer.on_reply(&reply);
                return TurnOutcome::Reply(reply);
            }

            if let Some(action) = decision.action {
                observer.on_action(&action);
                self.events
                    .log(EventKind::Action, &action.describe(), None)
                    .await;

                let result = self.tools.dispatch(&action.tool, &action.args).await;
                observer.on_tool_result(&action.tool, &result);

                current_input = tool_output(&result);
                origin = InputOrigin::ToolOutput;
                continue;
            }

            let text = decision
                .thought
                .unwrap_or_else(|| FALLBACK_REPLY.to_string());
            observer.on_reply(&text);
            return TurnOutcome::Reply(text);
        }

        info!("Decision loop hit the cap of {} turns", self.max_turns);
        observer.on_cap_reached(self.max_turns);
        TurnOutcome::CapReached(self.max_turns)
    }
}
