//! Decision wire types shared between the engine and tool implementations
//!
//! The model answers every turn with a single JSON object:
//!
//! ```json
//! {"thought": "...", "action": {"tool": "run_command", "args": ["ls"]}}
//! {"thought": "...", "reply": "Done."}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix marking an input as the output of a tool run rather than human text.
pub const TOOL_OUTPUT_PREFIX: &str = "Tool Output: ";

/// Prefix every tool error result starts with.
pub const TOOL_ERROR_PREFIX: &str = "Error:";

/// Wrap a tool result so it can be fed back as the next agent input.
pub fn tool_output(result: &str) -> String {
    format!("{}{}", TOOL_OUTPUT_PREFIX, result)
}

/// Format a tool failure as result text.
pub fn tool_error(detail: impl fmt::Display) -> String {
    format!("{} {}", TOOL_ERROR_PREFIX, detail)
}

/// Returns true when the input was produced by a tool run.
pub fn is_tool_output(input: &str) -> bool {
    input.starts_with(TOOL_OUTPUT_PREFIX)
}

/// Who produced the input of a turn
///
/// Only [`InputOrigin::User`] input may start a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOrigin {
    /// Text typed by a human
    User,
    /// A tool result fed back by the decision loop
    ToolOutput,
    /// A corrective prompt sent after an unparseable response
    Correction,
}

impl InputOrigin {
    /// Origin of free-standing input, judged by the tool output marker
    pub fn of(input: &str) -> Self {
        if is_tool_output(input) {
            InputOrigin::ToolOutput
        } else {
            InputOrigin::User
        }
    }

    pub fn is_user(self) -> bool {
        self == InputOrigin::User
    }
}

/// A parsed model decision
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    /// Internal reasoning; logged, never shown unless there is nothing else
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,

    /// Tool the driver should run next
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRequest>,

    /// Final answer for the user; ends the decision loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl Decision {
    /// A decision carrying only a reply
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            ..Default::default()
        }
    }

    /// A decision carrying only an action
    pub fn action(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            action: Some(ActionRequest::new(tool, args)),
            ..Default::default()
        }
    }
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRequest {
    /// Name of the tool to call
    pub tool: String,

    /// Ordered text arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl ActionRequest {
    pub fn new(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    /// Render as `tool(["arg", ...])` for notes and logs.
    pub fn describe(&self) -> String {
        let args = serde_json::to_string(&self.args).unwrap_or_else(|_| "[]".to_string());
        format!("{}({})", self.tool, args)
    }
}
