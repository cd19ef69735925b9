//! Core tool trait
//!
//! Every tool the agent can dispatch implements `CoreTool`. Tools never return
//! errors across this boundary: a failure is encoded as text starting with
//! `"Error:"` so the model can read it and adapt.

use async_trait::async_trait;

use crate::types::tool_error;

/// Trait that all core tools must implement
#[async_trait]
pub trait CoreTool: Send + Sync {
    /// Name the model uses in `{"action": {"tool": ...}}`
    fn name(&self) -> &str;

    /// One-line signature shown in the system prompt, e.g. `run_command(cmd)`
    fn signature(&self) -> &str;

    /// What the tool does, for the system prompt
    fn description(&self) -> &str;

    /// Run the tool with ordered text arguments
    async fn call(&self, args: &[String]) -> String;
}

/// Fetch a required positional argument or produce the standard error text.
pub fn required_arg<'a>(tool: &str, args: &'a [String], index: usize) -> Result<&'a str, String> {
    args.get(index).map(String::as_str).ok_or_else(|| {
        tool_error(format_args!(
            "{} requires {} argument(s), got {}",
            tool,
            index + 1,
            args.len()
        ))
    })
}
