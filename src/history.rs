use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::challenge::Challenge;
use crate::error::StoreError;
use crate::monitor::CompletionEvent;

/// One row of the completion log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub challenge_id: String,
    pub title: String,
    pub points_awarded: u32,
    pub trigger: String,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn from_event(event: &CompletionEvent, challenge: Option<&Challenge>) -> Self {
        Self {
            challenge_id: event.challenge_id.to_string(),
            title: challenge.map(|c| c.title.clone()).unwrap_or_default(),
            points_awarded: event.points_awarded,
            trigger: event.trigger.to_string(),
            completed_at: event.at,
        }
    }
}

/// Completion history, kept next to the key-value data in the same database file
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS completion_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                challenge_id TEXT NOT NULL,
                title TEXT NOT NULL,
                points_awarded INTEGER NOT NULL,
                completed_via TEXT NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE INDEX IF NOT EXISTS idx_completion_history_at
            ON completion_history(completed_at)
            "#,
            [],
        )?;

        Ok(Self { conn })
    }

    pub fn record(&self, record: &CompletionRecord) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO completion_history
            (challenge_id, title, points_awarded, completed_via, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.challenge_id,
                record.title,
                record.points_awarded,
                record.trigger,
                record.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Newest first
    pub fn list(&self) -> Result<Vec<CompletionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT challenge_id, title, points_awarded, completed_via, completed_at
            FROM completion_history
            ORDER BY completed_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let at: String = row.get(4)?;
            let completed_at = DateTime::parse_from_rfc3339(&at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Utc);

            Ok(CompletionRecord {
                challenge_id: row.get(0)?,
                title: row.get(1)?,
                points_awarded: row.get(2)?,
                trigger: row.get(3)?,
                completed_at,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM completion_history", [])?;
        Ok(())
    }

    /// Write the whole log as CSV with a header row
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        let mut csv = csv::Writer::from_writer(writer);
        for record in self.list()? {
            csv.serialize(&record)?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// "3 minutes ago" style label for a past timestamp
pub fn humanize_since(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - at).to_std().unwrap_or_default();
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}
