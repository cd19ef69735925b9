//! Restart Core Tool
//!
//! Lets the agent apply changes to its own code: the tool answers immediately
//! and the process exits shortly after, leaving the supervisor (or the user)
//! to start it again. Task state is already on disk by then.

use async_trait::async_trait;
use sdk::CoreTool;
use std::sync::Arc;
use std::time::Duration;

/// Delay between answering and exiting, so the answer can be logged
const GRACE_PERIOD: Duration = Duration::from_millis(500);

type ExitHook = Arc<dyn Fn() + Send + Sync>;

pub struct RestartTool {
    on_exit: ExitHook,
    grace: Duration,
}

impl RestartTool {
    /// Restart by exiting the process with status 0
    pub fn new() -> Self {
        Self::with_hook(Arc::new(|| {
            tracing::info!("Exiting for restart");
            std::process::exit(0);
        }))
    }

    /// Run `on_exit` instead of exiting
    pub fn with_hook(on_exit: ExitHook) -> Self {
        Self {
            on_exit,
            grace: GRACE_PERIOD,
        }
    }
}

impl Default for RestartTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoreTool for RestartTool {
    fn name(&self) -> &str {
        "restart"
    }

    fn signature(&self) -> &str {
        "restart()"
    }

    fn description(&self) -> &str {
        "Restart the agent process so changes under src/ take effect."
    }

    async fn call(&self, _args: &[String]) -> String {
        tracing::info!("Restart requested, exiting in {}ms", self.grace.as_millis());

        let on_exit = Arc::clone(&self.on_exit);
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            on_exit();
        });

        "Restarting now...".to_string()
    }
}
