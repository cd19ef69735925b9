//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: interactive read → decision loop → print cycle
//! - run: one decision loop for a single request
//! - status: task state, provider availability and recent events
//! - reset: return the task state to idle

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::error::ReadlineError;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

use crate::agent::{
    build_system_prompt, Agent, Driver, TaskState, TaskStateStore, TurnObserver, TurnOutcome,
};
use crate::config::Config;
use crate::db::Database;
use crate::events::{EventKind, EventSink, SessionLog};
use crate::llm::router::LLMRouter;
use crate::secrets::ApiKeys;
use crate::tools::ToolRegistry;
use sdk::errors::EngineError;
use sdk::ActionRequest;

/// Characters of a tool result shown in the terminal
const RESULT_PREVIEW_CHARS: usize = 100;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Everything one agent session needs, wired from configuration
pub struct Session {
    pub agent: Agent,
    pub driver: Driver,
    pub log: Arc<SessionLog>,
    database: Database,
}

impl Session {
    /// Open the event log, build the router and tools, and load task state
    pub async fn start(config: &Config) -> Result<Self> {
        let database = Database::new(&config.event_db_path())
            .await
            .context("Failed to open event database")?;
        let log = Arc::new(SessionLog::start(&database, &config.session_log_dir()).await?);
        let events: Arc<dyn EventSink> = Arc::clone(&log) as Arc<dyn EventSink>;

        let router = Arc::new(LLMRouter::from_config(
            &config.llm,
            &ApiKeys::from_env(),
            Arc::clone(&events),
        ));

        let tools = Arc::new(
            ToolRegistry::builtin(&config.core.workspace)
                .context("Failed to set up built-in tools")?,
        );

        let agent = Agent::open(
            router,
            Arc::clone(&events),
            build_system_prompt(&tools.system_prompt_section()),
            TaskStateStore::new(config.task_state_path()),
            config.agent.history_ceiling,
            config.agent.history_tail,
        )
        .await?;

        let driver = Driver::new(tools, config.agent.max_turns, Arc::clone(&events));

        events
            .log(
                EventKind::System,
                &format!("Session started in {}", config.core.workspace.display()),
                None,
            )
            .await;

        Ok(Self {
            agent,
            driver,
            log,
            database,
        })
    }

    /// Run one human request through the decision loop
    pub async fn handle(&mut self, input: &str, observer: &mut dyn TurnObserver) -> TurnOutcome {
        self.driver.run(&mut self.agent, input, observer).await
    }

    /// Flush the event log to disk
    pub async fn close(self) -> Result<()> {
        let Session { log, database, .. } = self;
        if let Err(e) = database
            .events()
            .set_session_summary(log.session_id(), "closed")
            .await
        {
            tracing::warn!("Failed to summarize session: {:#}", e);
        }
        database.close().await
    }
}

/// Prints loop progress to the terminal
#[derive(Debug, Default)]
pub struct TerminalObserver;

impl TurnObserver for TerminalObserver {
    fn on_thinking(&mut self, _turn: usize) {
        print!("{}\r", "Thinking... ".yellow());
        let _ = std::io::stdout().flush();
    }

    fn on_thought(&mut self, thought: &str) {
        println!("{}", format!("Thought: {}", thought).dimmed());
    }

    fn on_action(&mut self, action: &ActionRequest) {
        println!("{}", format!("Action: {}", action.describe()).cyan());
    }

    fn on_tool_result(&mut self, _tool: &str, result: &str) {
        let preview: String = result.chars().take(RESULT_PREVIEW_CHARS).collect();
        println!("{}", format!("Result: {}...", preview).dimmed());
    }

    fn on_reply(&mut self, reply: &str) {
        println!("{} {}", "Genesis:".green().bold(), reply);
    }

    fn on_parse_error(&mut self, raw: &str) {
        println!("{} {}", "Error parsing JSON from agent:".red(), raw);
    }

    fn on_cap_reached(&mut self, max_turns: usize) {
        println!(
            "{}",
            format!("Stopped after {} turns without a reply.", max_turns).yellow()
        );
    }
}

/// Interactive session
///
/// Reads lines until `exit`, Ctrl-C or Ctrl-D and runs each through the
/// decision loop.
pub async fn handle_chat(config: &Config) -> Result<()> {
    let mut session = Session::start(config).await?;

    println!("{}", "Starting Genesis...".green().bold());
    println!("{}", "Type 'exit' to quit.".bright_black());

    let mut rl = rustyline::DefaultEditor::new().context("Failed to initialise line editor")?;
    let prompt = format!("{} ", "You:".blue());
    let mut observer = TerminalObserver;

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }
                let _ = rl.add_history_entry(input);

                session.handle(input, &mut observer).await;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", "Error:".bright_red(), err);
                break;
            }
        }
    }

    println!("{}", "Goodbye!".bright_blue());
    session.close().await
}

/// Run one request and exit
///
/// Fails with `MaxIterationsExceeded` when the turn cap is hit, so the
/// process exits non-zero.
pub async fn handle_run(task: String, config: &Config, format: OutputFormat) -> Result<()> {
    let mut session = Session::start(config).await?;

    let outcome = match format {
        OutputFormat::Text => {
            println!("Executing task: {}", task);
            println!();
            session.handle(&task, &mut TerminalObserver).await
        }
        OutputFormat::Json => {
            session
                .handle(&task, &mut crate::agent::SilentObserver)
                .await
        }
    };

    if let OutputFormat::Json = format {
        let state = session.agent.state();
        let output = match &outcome {
            TurnOutcome::Reply(reply) => json!({
                "status": "replied",
                "reply": reply,
                "task_state": state,
            }),
            TurnOutcome::CapReached(max) => json!({
                "status": "cap_reached",
                "max_turns": max,
                "task_state": state,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    session.close().await?;

    match outcome {
        TurnOutcome::Reply(_) => Ok(()),
        TurnOutcome::CapReached(max) => Err(EngineError::MaxIterationsExceeded(max).into()),
    }
}

/// Show task state, provider availability and recent events
pub async fn handle_status(config: &Config, limit: usize, format: OutputFormat) -> Result<()> {
    let state = TaskStateStore::new(config.task_state_path()).load().await;

    let router = LLMRouter::from_config(
        &config.llm,
        &ApiKeys::from_env(),
        Arc::new(crate::events::NullSink),
    );
    let health = router.check_health().await;

    let database = Database::new(&config.event_db_path())
        .await
        .context("Failed to open event database")?;
    let events = database
        .events()
        .recent_events(limit as i64)
        .await
        .context("Failed to fetch recent events")?;

    match format {
        OutputFormat::Text => {
            print_task_state(&state);

            println!();
            println!("Providers:");
            for (name, model, healthy) in &health {
                let availability = if *healthy {
                    "available".green()
                } else {
                    "unavailable".red()
                };
                println!("  {:<10} {:<28} {}", name, model, availability);
            }

            println!();
            if events.is_empty() {
                println!("No events recorded");
            } else {
                println!("Recent events:");
                for event in events.iter().rev() {
                    let content: String =
                        event.content.replace('\n', " ").chars().take(80).collect();
                    println!("  {} {:<9} {}", event.timestamp, event.kind, content);
                }
            }
        }
        OutputFormat::Json => {
            let providers: Vec<_> = health
                .iter()
                .map(|(name, model, healthy)| {
                    json!({"name": name, "model": model, "available": healthy})
                })
                .collect();
            let output = json!({
                "task_state": state,
                "providers": providers,
                "recent_events": events,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    database.close().await
}

/// Return the task state to idle
pub async fn handle_reset(config: &Config, format: OutputFormat) -> Result<()> {
    let state = TaskStateStore::new(config.task_state_path()).reset().await?;

    match format {
        OutputFormat::Text => println!("Task state reset to {}", state.status),
        OutputFormat::Json => println!("{}", json!({"status": state.status})),
    }
    Ok(())
}

fn print_task_state(state: &TaskState) {
    println!("Task:    {}", state.task.as_deref().unwrap_or("(none)"));
    println!("Status:  {} (step {})", state.status, state.current_step);
    if let Some(started) = state.started_at {
        println!("Started: {}", started.to_rfc3339());
    }
    if let Some(updated) = state.last_updated {
        println!("Updated: {}", updated.to_rfc3339());
    }
    if !state.notes.is_empty() {
        println!("Notes:");
        let skip = state.notes.len().saturating_sub(5);
        for note in &state.notes[skip..] {
            println!("  - {}", note);
        }
    }
}
