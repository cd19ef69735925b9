//! Domain event log
//!
//! Records what the agent did: thoughts, tool actions, provider requests and
//! responses with token usage and cost, user input and errors. This is
//! separate from the `tracing` diagnostics; each event lands in the SQLite
//! `events` table and as one line in the session's markdown transcript.

use async_trait::async_trait;
use chrono::{Local, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

use crate::db::{Database, EventRecord, EventRepository};

/// Longest request preview written to the transcript
const REQUEST_PREVIEW_CHARS: usize = 100;

/// Kind of a logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Thought,
    Action,
    ApiReq,
    ApiCall,
    User,
    System,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Thought => "THOUGHT",
            EventKind::Action => "ACTION",
            EventKind::ApiReq => "API_REQ",
            EventKind::ApiCall => "API_CALL",
            EventKind::User => "USER",
            EventKind::System => "SYSTEM",
            EventKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage attached to provider events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMetrics {
    pub model: Option<String>,
    pub tokens_in: u64,
    pub tokens_out: u64,
    /// Explicit cost in USD; computed from the model price table when absent
    pub cost: Option<f64>,
    pub duration_ms: u64,
}

impl EventMetrics {
    /// Metrics naming only the model
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Default::default()
        }
    }

    /// Cost in USD, explicit or derived from usage
    pub fn effective_cost(&self) -> f64 {
        match self.cost {
            Some(cost) if cost > 0.0 => cost,
            _ => calculate_cost(self.model.as_deref(), self.tokens_in, self.tokens_out),
        }
    }
}

/// Receiver of domain events
///
/// Logging never fails the caller; implementations report their own I/O
/// problems through `tracing`.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn log(&self, kind: EventKind, content: &str, metrics: Option<EventMetrics>);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn log(&self, _kind: EventKind, _content: &str, _metrics: Option<EventMetrics>) {}
}

/// In-memory sink, handy for inspecting what a run logged
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(EventKind, String, Option<EventMetrics>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn events(&self) -> Vec<(EventKind, String, Option<EventMetrics>)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Logged kinds in order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|(kind, _, _)| kind).collect()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn log(&self, kind: EventKind, content: &str, metrics: Option<EventMetrics>) {
        let entry = (kind, content.to_string(), metrics);
        match self.events.lock() {
            Ok(mut events) => events.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// USD cost of a call, priced per million tokens
///
/// Unknown and local models are free. Zero usage on either side yields zero.
pub fn calculate_cost(model: Option<&str>, tokens_in: u64, tokens_out: u64) -> f64 {
    let Some(model) = model else {
        return 0.0;
    };
    if tokens_in == 0 || tokens_out == 0 {
        return 0.0;
    }

    let (price_in, price_out) = if model.contains("claude-3-5") {
        (3.00, 15.00)
    } else if model.contains("gpt-4o") {
        (2.50, 10.00)
    } else if model.contains("deepseek") {
        (0.07, 0.28)
    } else {
        (0.0, 0.0)
    };

    (tokens_in as f64 / 1_000_000.0) * price_in + (tokens_out as f64 / 1_000_000.0) * price_out
}

/// Render one transcript line
///
/// `[HH:MM:SS] TYPE (model) [Tokens: in → out] [Cost: $x]: body`
pub fn format_transcript_line(
    time: &str,
    kind: EventKind,
    content: &str,
    metrics: Option<&EventMetrics>,
    cost: f64,
) -> String {
    let mut header = format!("[{}] {}", time, kind);
    if let Some(model) = metrics.and_then(|m| m.model.as_deref()) {
        header.push_str(&format!(" ({})", model));
    }

    let mut meta = String::new();
    if let Some(m) = metrics {
        if m.tokens_in > 0 || m.tokens_out > 0 {
            meta.push_str(&format!(" [Tokens: {} → {}]", m.tokens_in, m.tokens_out));
        }
    }
    if cost > 0.0 {
        meta.push_str(&format!(" [Cost: ${:.5}]", cost));
    }

    let body = match kind {
        EventKind::ApiReq => condense_request(content),
        EventKind::Error => format!("!! {} !!", content.trim()),
        _ => content.trim().to_string(),
    };

    format!("{}{}: {}\n", header, meta, body)
}

/// Shrink a serialized conversation to a preview of its last message
fn condense_request(content: &str) -> String {
    let last = serde_json::from_str::<serde_json::Value>(content)
        .ok()
        .and_then(|v| {
            v.as_array()
                .and_then(|history| history.last())
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_str())
                .map(str::to_string)
        });

    match last {
        Some(text) => {
            let flat = text.replace('\n', " ");
            let preview: String = flat.chars().take(REQUEST_PREVIEW_CHARS).collect();
            let ellipsis = if flat.chars().count() > REQUEST_PREVIEW_CHARS {
                "..."
            } else {
                ""
            };
            format!("User: \"{}{}\"", preview, ellipsis)
        }
        None => content.trim().to_string(),
    }
}

/// Event log for one process run, backed by SQLite and a markdown transcript
pub struct SessionLog {
    session_id: String,
    repo: EventRepository,
    transcript: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl SessionLog {
    /// Register a new session and open its transcript
    pub async fn start(db: &Database, log_dir: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let now = Utc::now();
        let session_id = now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string();

        tokio::fs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        let repo = db.events();
        repo.create_session(&session_id, &now.to_rfc3339()).await?;

        let transcript = log_dir.join(format!("session_{}.md", session_id));
        tokio::fs::write(&transcript, format!("# Agent Session: {}\n\n", session_id))
            .await
            .with_context(|| format!("Failed to create transcript {}", transcript.display()))?;

        tracing::info!("Session {} logging to {}", session_id, transcript.display());

        Ok(Self {
            session_id,
            repo,
            transcript,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript_path(&self) -> &Path {
        &self.transcript
    }

    async fn append_transcript(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.transcript)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl EventSink for SessionLog {
    async fn log(&self, kind: EventKind, content: &str, metrics: Option<EventMetrics>) {
        let cost = metrics
            .as_ref()
            .map(EventMetrics::effective_cost)
            .unwrap_or(0.0);
        let m = metrics.clone().unwrap_or_default();

        let record = EventRecord {
            id: None,
            session_id: self.session_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            kind: kind.as_str().to_string(),
            content: content.to_string(),
            model: m.model.clone(),
            tokens_in: m.tokens_in as i64,
            tokens_out: m.tokens_out as i64,
            cost,
            duration_ms: m.duration_ms as i64,
        };

        if let Err(e) = self.repo.insert_event(&record).await {
            tracing::warn!("Failed to store {} event: {:#}", kind, e);
        }

        let time = Local::now().format("%H:%M:%S").to_string();
        let line = format_transcript_line(&time, kind, content, metrics.as_ref(), cost);
        if let Err(e) = self.append_transcript(&line).await {
            tracing::warn!("Failed to append to transcript: {}", e);
        }
    }
}
