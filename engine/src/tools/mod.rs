pub mod filesystem;
pub mod restart;
pub mod terminal;

pub use filesystem::{ListFilesTool, PathResolver, ReadFileTool, WriteFileTool};
pub use restart::RestartTool;
pub use terminal::TerminalTool;

use sdk::errors::EngineError;
use sdk::{tool_error, CoreTool};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Registry of tools the agent can dispatch.
///
/// Built once at startup; the name → tool map does not change afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn CoreTool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in tool set rooted at `workspace`.
    ///
    /// `src/...` paths resolve against the process working directory.
    pub fn builtin(workspace: impl Into<PathBuf>) -> std::io::Result<Self> {
        let workspace = workspace.into();
        let paths = PathResolver::from_cwd(&workspace)?;

        Ok(Self::empty()
            .with(TerminalTool::new(&workspace))
            .with(WriteFileTool::new(paths.clone()))
            .with(ReadFileTool::new(paths.clone()))
            .with(ListFilesTool::new(paths))
            .with(RestartTool::new()))
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn with(mut self, tool: impl CoreTool + 'static) -> Self {
        self.register(Box::new(tool));
        self
    }

    pub fn register(&mut self, tool: Box<dyn CoreTool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Tool '{}' registered twice, keeping the latest", name);
        }
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Result<&dyn CoreTool, EngineError> {
        self.tools
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| EngineError::ToolNotFound(name.to_string()))
    }

    /// Dispatch a tool call by name.
    ///
    /// Always returns text. Unknown tools produce `Error: Tool <name> not found.`
    /// so the model can see the error and self-correct.
    pub async fn dispatch(&self, name: &str, args: &[String]) -> String {
        debug!("Dispatching tool '{}' with {} arg(s)", name, args.len());

        match self.resolve(name) {
            Ok(tool) => tool.call(args).await,
            Err(_) => {
                warn!("Unknown tool requested: {}", name);
                tool_error(format_args!("Tool {} not found.", name))
            }
        }
    }

    /// Names of all registered tools, sorted.
    pub fn available_tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tool list for the system prompt.
    pub fn system_prompt_section(&self) -> String {
        let mut parts = vec!["TOOLS:".to_string()];
        for tool in self.tools.values() {
            parts.push(format!("- {}: {}", tool.signature(), tool.description()));
        }
        parts.join("\n")
    }
}
