//! Call summary persistence
//!
//! One row per finished call, kept in SQLite next to the report files.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use callbridge_relay::CallSummary;

/// Storage failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Persisted record of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub call_id: String,
    pub duration_secs: f64,
    pub final_state: String,
    /// JSON digest of the transcript events.
    pub outcome: String,
    pub report_path: Option<String>,
}

impl SummaryRecord {
    /// Build a record from a finished call's summary.
    pub fn from_summary(summary: &CallSummary, report_path: Option<&str>) -> Self {
        Self {
            call_id: summary.call_id.clone(),
            duration_secs: summary.duration_secs(),
            final_state: summary.final_state.as_str().to_string(),
            outcome: serde_json::to_string(&summary.transcripts).unwrap_or_default(),
            report_path: report_path.map(str::to_owned),
        }
    }
}

/// SQLite-backed summary store.
pub struct SummaryStore {
    conn: Mutex<Connection>,
}

impl SummaryStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS call_summaries (
                id          TEXT PRIMARY KEY,
                duration    REAL NOT NULL,
                final_state TEXT NOT NULL,
                outcome     TEXT,
                report_path TEXT
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Upsert one call summary.
    pub fn save(&self, record: &SummaryRecord) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO call_summaries (id, duration, final_state, outcome, report_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.call_id,
                record.duration_secs,
                record.final_state,
                record.outcome,
                record.report_path,
            ],
        )?;
        Ok(())
    }

    /// Load one call summary by call identifier.
    pub fn load(&self, call_id: &str) -> Result<Option<SummaryRecord>, StoreError> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT id, duration, final_state, outcome, report_path
                 FROM call_summaries WHERE id = ?1",
                params![call_id],
                |row| {
                    Ok(SummaryRecord {
                        call_id: row.get(0)?,
                        duration_secs: row.get(1)?,
                        final_state: row.get(2)?,
                        outcome: row.get(3)?,
                        report_path: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Number of stored summaries.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM call_summaries", [], |row| row.get(0))?;
        Ok(count)
    }
}
