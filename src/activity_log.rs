use chrono::{DateTime, Local, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::selectors::WorkoutResult;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("could not encode result: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("save rejected: {0}")]
    Rejected(String),
}

/// Receives a finished session. Implementations decide where it goes.
pub trait ActivityLog {
    fn save(&mut self, result: &WorkoutResult) -> Result<(), SaveError>;
}

/// One row of the session history listing
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: i64,
    pub workout_id: String,
    pub workout_name: String,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: DateTime<Local>,
    pub duration_minutes: i64,
    pub completed_sets: i64,
    pub total_sets: i64,
}

#[derive(Debug, Serialize)]
struct SetRow {
    session_id: i64,
    workout_name: String,
    finished_at: String,
    exercise_id: String,
    exercise: String,
    set_number: i64,
    completed: bool,
    reps: Option<i64>,
    weight: Option<f64>,
    duration: Option<i64>,
    distance: Option<f64>,
    notes: Option<String>,
}

/// Activity log backed by a local SQLite file
#[derive(Debug)]
pub struct SqliteActivityLog {
    conn: Connection,
}

impl SqliteActivityLog {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SaveError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!(path = %path.display(), "opening activity log");
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, SaveError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SaveError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id TEXT NOT NULL,
                workout_name TEXT NOT NULL,
                started_at TEXT,
                finished_at TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                completed_sets INTEGER NOT NULL,
                total_sets INTEGER NOT NULL,
                result_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS session_sets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                exercise_id TEXT NOT NULL,
                exercise_name TEXT NOT NULL,
                set_number INTEGER NOT NULL,
                completed BOOLEAN NOT NULL,
                reps INTEGER,
                weight REAL,
                duration INTEGER,
                distance REAL,
                notes TEXT,
                completed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_finished ON sessions(finished_at);
            CREATE INDEX IF NOT EXISTS idx_session_sets_session ON session_sets(session_id);
            "#,
        )?;

        Ok(Self { conn })
    }

    /// Most recently finished sessions first
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>, SaveError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, workout_id, workout_name, started_at, finished_at,
                   duration_minutes, completed_sets, total_sets
            FROM sessions
            ORDER BY finished_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let started: Option<String> = row.get(3)?;
            let finished: String = row.get(4)?;
            Ok(SessionSummary {
                id: row.get(0)?,
                workout_id: row.get(1)?,
                workout_name: row.get(2)?,
                started_at: started.as_deref().and_then(parse_timestamp),
                finished_at: parse_timestamp(&finished).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "finished_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?,
                duration_minutes: row.get(5)?,
                completed_sets: row.get(6)?,
                total_sets: row.get(7)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Write every logged set to `path` as CSV. Returns the number of rows.
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize, SaveError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.workout_name, s.finished_at,
                   ss.exercise_id, ss.exercise_name, ss.set_number, ss.completed,
                   ss.reps, ss.weight, ss.duration, ss.distance, ss.notes
            FROM session_sets ss
            JOIN sessions s ON s.id = ss.session_id
            ORDER BY s.finished_at, s.id, ss.id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SetRow {
                session_id: row.get(0)?,
                workout_name: row.get(1)?,
                finished_at: row.get(2)?,
                exercise_id: row.get(3)?,
                exercise: row.get(4)?,
                set_number: row.get(5)?,
                completed: row.get(6)?,
                reps: row.get(7)?,
                weight: row.get(8)?,
                duration: row.get(9)?,
                distance: row.get(10)?,
                notes: row.get(11)?,
            })
        })?;

        let mut writer = csv::Writer::from_path(path.as_ref())?;
        let mut count = 0;
        for row in rows {
            writer.serialize(row?)?;
            count += 1;
        }
        writer.flush()?;

        info!(rows = count, path = %path.as_ref().display(), "exported activity log");
        Ok(count)
    }
}

impl ActivityLog for SqliteActivityLog {
    fn save(&mut self, result: &WorkoutResult) -> Result<(), SaveError> {
        let json = serde_json::to_string(result)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO sessions
            (workout_id, workout_name, started_at, finished_at, duration_minutes,
             completed_sets, total_sets, result_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                result.workout_id,
                result.workout_name,
                result.started_at.map(|t| utc_text(&t)),
                utc_text(&result.finished_at),
                result.duration_minutes,
                result.progress.completed as i64,
                result.progress.total as i64,
                json,
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        for exercise in &result.exercises {
            for set in &exercise.sets {
                let perf = set.performance.as_ref();
                tx.execute(
                    r#"
                    INSERT INTO session_sets
                    (session_id, exercise_id, exercise_name, set_number, completed,
                     reps, weight, duration, distance, notes, completed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    "#,
                    params![
                        session_id,
                        exercise.exercise_id,
                        exercise.name,
                        set.set_number as i64,
                        set.completed,
                        perf.and_then(|p| p.reps).map(i64::from),
                        perf.and_then(|p| p.weight).map(f64::from),
                        perf.and_then(|p| p.duration).map(i64::from),
                        perf.and_then(|p| p.distance).map(f64::from),
                        perf.and_then(|p| p.notes.clone()),
                        perf.map(|p| utc_text(&p.completed_at)),
                    ],
                )?;
            }
        }

        tx.commit()?;
        info!(session_id, workout = %result.workout_name, "saved workout");
        Ok(())
    }
}

/// Timestamps are stored in UTC so the text sorts chronologically
fn utc_text(t: &DateTime<Local>) -> String {
    t.with_timezone(&Utc).to_rfc3339()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Local))
}
