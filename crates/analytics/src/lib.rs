#![deny(unused)]
//! SQLite-backed usage analytics.
//!
//! Records one row per answered (or failed) question plus per-session
//! summaries. Logging is advisory: callers are expected to warn on a failed
//! write and carry on serving the request.

use std::sync::Arc;

use rusqlite::{params, Connection};
use serde::Serialize;

use kiosk_core::{Error, Result};

/// A single question/answer event, as recorded.
#[derive(Debug, Clone)]
pub struct InteractionRecord {
    pub session_id: String,
    pub model_used: String,
    pub prompt_chars: usize,
    pub latency_seconds: f64,
    pub cached: bool,
    pub errored: bool,
    pub language: Option<String>,
}

/// Aggregates for the insights endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub total_interactions: i64,
    pub cache_hits: i64,
    pub errors: i64,
    pub avg_latency_seconds: f64,
    pub interactions_per_model: Vec<ModelUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelUsage {
    pub model: String,
    pub count: i64,
}

pub struct AnalyticsStore {
    conn: Arc<tokio::sync::Mutex<Connection>>,
}

impl AnalyticsStore {
    /// Open (or create) the analytics database at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::analytics(format!("DB open error: {}", e)))?;
        Self::with_connection(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::analytics(format!("DB open error: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                model_used TEXT NOT NULL,
                prompt_chars INTEGER NOT NULL,
                latency_seconds REAL NOT NULL,
                cached INTEGER NOT NULL,
                errored INTEGER NOT NULL,
                language TEXT,
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::analytics(format!("Schema error: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_interactions_session
                 ON interactions (session_id)",
            [],
        )
        .map_err(|e| Error::analytics(format!("Index error: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                question_count INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                last_seen INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| Error::analytics(format!("Schema error: {}", e)))?;

        Ok(Self {
            conn: Arc::new(tokio::sync::Mutex::new(conn)),
        })
    }

    /// Record a question/answer event.
    pub async fn log_interaction(&self, record: InteractionRecord) -> Result<()> {
        let conn = self.conn.clone();
        let now = chrono::Utc::now().timestamp();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO interactions
                     (session_id, model_used, prompt_chars, latency_seconds,
                      cached, errored, language, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.session_id,
                    record.model_used,
                    record.prompt_chars as i64,
                    record.latency_seconds,
                    record.cached as i64,
                    record.errored as i64,
                    record.language,
                    now
                ],
            )
            .map_err(|e| Error::analytics(format!("Insert error: {}", e)))?;

            conn.execute(
                "INSERT INTO sessions (session_id, question_count, error_count, last_seen)
                 VALUES (?1, 1, ?2, ?3)
                 ON CONFLICT(session_id) DO UPDATE SET
                     question_count = question_count + 1,
                     error_count = error_count + excluded.error_count,
                     last_seen = excluded.last_seen",
                params![record.session_id, record.errored as i64, now],
            )
            .map_err(|e| Error::analytics(format!("Upsert error: {}", e)))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::analytics(e.to_string()))?
    }

    /// Aggregate interactions from the last `days` days.
    pub async fn insights(&self, days: u32) -> Result<Insights> {
        let conn = self.conn.clone();
        let since = chrono::Utc::now().timestamp() - i64::from(days) * 86_400;

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();

            let (total, cache_hits, errors, avg_latency) = conn
                .query_row(
                    "SELECT COUNT(*),
                            COALESCE(SUM(cached), 0),
                            COALESCE(SUM(errored), 0),
                            COALESCE(AVG(latency_seconds), 0.0)
                     FROM interactions WHERE created_at >= ?1",
                    params![since],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, f64>(3)?,
                        ))
                    },
                )
                .map_err(|e| Error::analytics(format!("Query error: {}", e)))?;

            let mut stmt = conn
                .prepare(
                    "SELECT model_used, COUNT(*) AS n
                     FROM interactions
                     WHERE created_at >= ?1 AND errored = 0
                     GROUP BY model_used ORDER BY n DESC",
                )
                .map_err(|e| Error::analytics(format!("Prepare error: {}", e)))?;

            let interactions_per_model = stmt
                .query_map(params![since], |row| {
                    Ok(ModelUsage {
                        model: row.get(0)?,
                        count: row.get(1)?,
                    })
                })
                .map_err(|e| Error::analytics(format!("Query error: {}", e)))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::analytics(format!("Result error: {}", e)))?;

            Ok(Insights {
                total_interactions: total,
                cache_hits,
                errors,
                avg_latency_seconds: avg_latency,
                interactions_per_model,
            })
        })
        .await
        .map_err(|e| Error::analytics(e.to_string()))?
    }

    /// Number of distinct sessions recorded.
    pub async fn session_count(&self) -> Result<i64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
                .map_err(|e| Error::analytics(format!("Count error: {}", e)))
        })
        .await
        .map_err(|e| Error::analytics(e.to_string()))?
    }
}
