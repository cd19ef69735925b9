//! Terminal Core Tool
//!
//! Runs shell commands through `sh -c` inside the workspace, with the same
//! privileges as the agent process.

use anyhow::Result;
use async_trait::async_trait;
use sdk::{required_arg, tool_error, CoreTool};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default time a command may run before it is killed
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct TerminalTool {
    work_dir: PathBuf,
    timeout: Duration,
}

impl TerminalTool {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute a command and return its output
    ///
    /// Stdout is returned when present, stderr otherwise. A non-zero exit
    /// status is an error carrying whatever the command printed.
    pub async fn execute(&self, command: &str) -> Result<String> {
        info!("Executing terminal command: {}", command);

        if command.trim().is_empty() {
            return Err(anyhow::anyhow!("Empty command"));
        }

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to start command: {}", e))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| anyhow::anyhow!("Failed to run command: {}", e))?,
            Err(_) => {
                let err_msg = format!(
                    "Command timed out after {} seconds",
                    self.timeout.as_secs()
                );
                warn!("{}", err_msg);
                return Err(anyhow::anyhow!(err_msg));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            debug!("Command succeeded");
            if stdout.is_empty() {
                Ok(stderr)
            } else {
                Ok(stdout)
            }
        } else {
            warn!("Command failed with status: {}", output.status);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(anyhow::anyhow!(
                "Command failed ({}): {}\n{}",
                output.status,
                command,
                detail.trim_end()
            ))
        }
    }
}

#[async_trait]
impl CoreTool for TerminalTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn signature(&self) -> &str {
        "run_command(cmd)"
    }

    fn description(&self) -> &str {
        "Execute any shell command (sh -c) in the workspace and return its output."
    }

    async fn call(&self, args: &[String]) -> String {
        let command = match required_arg(self.name(), args, 0) {
            Ok(command) => command,
            Err(e) => return e,
        };

        match self.execute(command).await {
            Ok(output) => output,
            Err(e) => tool_error(e),
        }
    }
}
