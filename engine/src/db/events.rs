/// Event log persistence
///
/// One `sessions` row per process run and one `events` row per logged event.
/// All queries use parameterized binds.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Event record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub id: Option<i64>,
    pub session_id: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Event kind label (THOUGHT, ACTION, ...)
    pub kind: String,
    pub content: String,
    pub model: Option<String>,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub cost: f64,
    pub duration_ms: i64,
}

/// Event repository for database operations
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Create a new event repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a session
    pub async fn create_session(&self, id: &str, start_time: &str) -> Result<()> {
        sqlx::query("INSERT INTO sessions (id, start_time) VALUES (?, ?)")
            .bind(id)
            .bind(start_time)
            .execute(&self.pool)
            .await
            .context("Failed to create session")?;

        Ok(())
    }

    /// Store a short summary for a session
    pub async fn set_session_summary(&self, id: &str, summary: &str) -> Result<()> {
        sqlx::query("UPDATE sessions SET summary = ? WHERE id = ?")
            .bind(summary)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update session summary")?;

        Ok(())
    }

    /// Insert an event, returning its row id
    pub async fn insert_event(&self, event: &EventRecord) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO events (session_id, timestamp, type, content, model, tokens_in, tokens_out, cost, duration_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.session_id)
        .bind(&event.timestamp)
        .bind(&event.kind)
        .bind(&event.content)
        .bind(&event.model)
        .bind(event.tokens_in)
        .bind(event.tokens_out)
        .bind(event.cost)
        .bind(event.duration_ms)
        .execute(&self.pool)
        .await
        .context("Failed to insert event")?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent events across all sessions, newest first
    pub async fn recent_events(&self, limit: i64) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(
            "SELECT id, session_id, timestamp, type, content, model, tokens_in, tokens_out, cost, duration_ms
             FROM events ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent events")?;

        Ok(rows.iter().map(row_to_event).collect())
    }

    /// All events of one session in insertion order
    pub async fn session_events(&self, session_id: &str) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(
            "SELECT id, session_id, timestamp, type, content, model, tokens_in, tokens_out, cost, duration_ms
             FROM events WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch session events")?;

        Ok(rows.iter().map(row_to_event).collect())
    }

    /// Total spend recorded for a session
    pub async fn session_cost(&self, session_id: &str) -> Result<f64> {
        let total: Option<f64> =
            sqlx::query_scalar("SELECT SUM(cost) FROM events WHERE session_id = ?")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to sum session cost")?;

        Ok(total.unwrap_or(0.0))
    }
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> EventRecord {
    EventRecord {
        id: row.get("id"),
        session_id: row.get("session_id"),
        timestamp: row.get("timestamp"),
        kind: row.get("type"),
        content: row.get("content"),
        model: row.get("model"),
        tokens_in: row.get("tokens_in"),
        tokens_out: row.get("tokens_out"),
        cost: row.get("cost"),
        duration_ms: row.get("duration_ms"),
    }
}
