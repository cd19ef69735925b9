//! Durable task progress
//!
//! A single JSON record describing what the agent is working on. It is loaded
//! once at startup and rewritten after every turn so progress survives
//! restarts (including the agent restarting itself).

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use sdk::Decision;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle of the current task
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Idle,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// True when a fresh user message should start a new task
    pub fn accepts_new_task(&self) -> bool {
        !matches!(self, TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted task record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskState {
    #[serde(default)]
    pub task: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub plan: Vec<String>,

    #[serde(default)]
    pub current_step: u32,

    /// Append-only progress notes
    #[serde(default)]
    pub notes: Vec<String>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl TaskState {
    /// Fold one completed turn into the record
    ///
    /// `fresh_input` is the human message behind this turn, if any; tool
    /// output never starts a task. `decision` is `None` when the response
    /// could not be parsed; only `last_updated` changes in that case.
    pub fn record_turn(
        &mut self,
        fresh_input: Option<&str>,
        decision: Option<&Decision>,
        now: DateTime<Utc>,
    ) {
        let Some(decision) = decision else {
            self.touch(now);
            return;
        };

        if let Some(input) = fresh_input {
            if self.status.accepts_new_task() {
                self.start(input, now);
            }
        }

        if let Some(thought) = &decision.thought {
            self.notes.push(format!("Thought: {}", thought));
        }

        if let Some(action) = &decision.action {
            self.notes.push(format!("Action: {}", action.describe()));
            self.current_step += 1;
        }

        if let Some(reply) = &decision.reply {
            self.notes.push(format!("Reply: {}", reply));
            if let Some(status) = classify_reply(reply) {
                self.status = status;
            }
        }

        self.touch(now);
    }

    /// Update only the timestamp
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now);
    }

    // Notes from earlier tasks stay; they are never rewritten.
    fn start(&mut self, task: &str, now: DateTime<Utc>) {
        self.task = Some(task.to_string());
        self.status = TaskStatus::InProgress;
        self.plan.clear();
        self.current_step = 0;
        self.started_at = Some(now);
        self.notes.push(format!("Task started: {}", task));
    }
}

/// Terminal status implied by a reply, if any
///
/// "completed" or "done" means completed; otherwise "failed" or "error" means
/// failed. Matching is case-insensitive and completion wins.
pub fn classify_reply(reply: &str) -> Option<TaskStatus> {
    let lower = reply.to_lowercase();
    if lower.contains("completed") || lower.contains("done") {
        Some(TaskStatus::Completed)
    } else if lower.contains("failed") || lower.contains("error") {
        Some(TaskStatus::Failed)
    } else {
        None
    }
}

/// JSON file holding the task record
#[derive(Debug, Clone)]
pub struct TaskStateStore {
    path: PathBuf,
}

impl TaskStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record; a missing or unreadable file yields an idle record
    pub async fn load(&self) -> TaskState {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No task state at {}, starting idle", self.path.display());
                return TaskState::default();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read task state {}: {}; starting idle",
                    self.path.display(),
                    e
                );
                return TaskState::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "Task state {} is corrupt ({}); starting idle",
                    self.path.display(),
                    e
                );
                TaskState::default()
            }
        }
    }

    /// Replace the file with `state` (temp file, then rename)
    pub async fn save(&self, state: &TaskState) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| EngineError::TaskState(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            EngineError::TaskState(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            EngineError::TaskState(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }

    /// Overwrite the file with an idle record and return it
    pub async fn reset(&self) -> Result<TaskState, EngineError> {
        let state = TaskState::default();
        self.save(&state).await?;
        Ok(state)
    }
}
