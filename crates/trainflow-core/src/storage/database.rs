//! SQLite-based plan and session storage.
//!
//! Provides persistent storage for:
//! - Imported training plans (details stored as a JSON column)
//! - Completed training sessions
//! - History and statistics aggregates
//! - Key-value store for application state (the serialized engine lives
//!   here between CLI invocations)

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, DatabaseError};
use crate::plan::{PlanDetails, TrainingPlan};

use super::data_dir;

/// One row of `plan list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub day_count: usize,
}

/// One completed training session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub day_label: String,
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
}

/// All-time aggregates over completed sessions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_duration_secs: u64,
    pub avg_duration_secs: u64,
    pub sessions_last_7_days: u64,
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// Per-day totals for the duration trend report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Calendar day, `YYYY-MM-DD` (UTC).
    pub day: String,
    pub sessions: u64,
    pub total_duration_secs: u64,
}

/// Session count per plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCount {
    pub plan_name: String,
    pub sessions: u64,
}

/// SQLite database for plans and completed sessions.
pub struct Database {
    conn: Connection,
}

fn parse_timestamp(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl Database {
    /// Open the database at `<data_dir>/trainflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("trainflow.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (and migrate) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS plans (
                    id          TEXT PRIMARY KEY,
                    name        TEXT NOT NULL,
                    description TEXT,
                    details     TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    plan_id       TEXT NOT NULL,
                    plan_name     TEXT NOT NULL,
                    day_label     TEXT NOT NULL,
                    duration_secs INTEGER NOT NULL,
                    completed_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                -- Indexes for the common history/stats query patterns
                CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
                CREATE INDEX IF NOT EXISTS idx_sessions_plan_id ON sessions(plan_id);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Plans ────────────────────────────────────────────────────────

    /// Store an imported plan.
    ///
    /// # Errors
    /// Returns an error if the details cannot be serialized or the
    /// insert fails.
    pub fn insert_plan(&self, plan: &TrainingPlan) -> Result<(), DatabaseError> {
        let details = serde_json::to_string(&plan.details)
            .map_err(|e| DatabaseError::QueryFailed(format!("serialize plan details: {e}")))?;
        self.conn.execute(
            "INSERT INTO plans (id, name, description, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                plan.id.to_string(),
                plan.name,
                plan.description,
                details,
                plan.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Newest-first page of stored plans, plus the total count.
    pub fn list_plans(&self, page: u32, limit: u32) -> Result<(Vec<PlanSummary>, u64), DatabaseError> {
        let total: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM plans", [], |row| row.get(0))?;

        let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, details, created_at
             FROM plans ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| {
            let id: String = row.get(0)?;
            let details: String = row.get(3)?;
            let created_at: String = row.get(4)?;
            let day_count = serde_json::from_str::<PlanDetails>(&details)
                .map(|d| d.days.len())
                .unwrap_or(0);
            Ok(PlanSummary {
                id: parse_uuid(&id)?,
                name: row.get(1)?,
                description: row.get(2)?,
                created_at: parse_timestamp(&created_at)?,
                day_count,
            })
        })?;

        let mut plans = Vec::new();
        for row in rows {
            plans.push(row?);
        }
        Ok((plans, total))
    }

    pub fn get_plan(&self, id: Uuid) -> Result<Option<TrainingPlan>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, details, created_at FROM plans WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id.to_string()], |row| {
            let id: String = row.get(0)?;
            let details: String = row.get(3)?;
            let created_at: String = row.get(4)?;
            let details: PlanDetails = serde_json::from_str(&details).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(TrainingPlan {
                id: parse_uuid(&id)?,
                name: row.get(1)?,
                description: row.get(2)?,
                created_at: parse_timestamp(&created_at)?,
                details,
            })
        })?;

        match rows.next() {
            Some(plan) => Ok(Some(plan?)),
            None => Ok(None),
        }
    }

    /// Rename a plan. Returns false when the id is unknown.
    pub fn rename_plan(&self, id: Uuid, name: &str) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE plans SET name = ?2 WHERE id = ?1",
            params![id.to_string(), name],
        )?;
        Ok(changed > 0)
    }

    /// Delete a plan. Returns false when the id is unknown. Completed
    /// session records keep their copied plan name.
    pub fn delete_plan(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let changed = self
            .conn
            .execute("DELETE FROM plans WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Record a completed session. This is the durable handoff target
    /// for the session engine.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        plan_id: Uuid,
        plan_name: &str,
        day_label: &str,
        duration_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (plan_id, plan_name, day_label, duration_secs, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                plan_id.to_string(),
                plan_name,
                day_label,
                duration_secs,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest-first page of completed sessions, plus the total count.
    pub fn list_sessions(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<SessionRecord>, u64), DatabaseError> {
        let total: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;

        let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let mut stmt = self.conn.prepare(
            "SELECT id, plan_id, plan_name, day_label, duration_secs, completed_at
             FROM sessions ORDER BY completed_at DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| {
            let plan_id: String = row.get(1)?;
            let completed_at: String = row.get(5)?;
            Ok(SessionRecord {
                id: row.get(0)?,
                plan_id: parse_uuid(&plan_id)?,
                plan_name: row.get(2)?,
                day_label: row.get(3)?,
                duration_secs: row.get(4)?,
                completed_at: parse_timestamp(&completed_at)?,
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok((sessions, total))
    }

    pub fn stats_all(&self) -> Result<Stats, DatabaseError> {
        let (total_sessions, total_duration_secs): (u64, u64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_secs), 0) FROM sessions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let week_ago = (Utc::now() - Duration::days(7)).to_rfc3339();
        let sessions_last_7_days: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE completed_at >= ?1",
            params![week_ago],
            |row| row.get(0),
        )?;

        let last_completed_at: Option<String> = self.conn.query_row(
            "SELECT MAX(completed_at) FROM sessions",
            [],
            |row| row.get(0),
        )?;
        let last_completed_at = match last_completed_at {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        };

        let avg_duration_secs = if total_sessions > 0 {
            total_duration_secs / total_sessions
        } else {
            0
        };

        Ok(Stats {
            total_sessions,
            total_duration_secs,
            avg_duration_secs,
            sessions_last_7_days,
            last_completed_at,
        })
    }

    /// Per-day session totals over the last `days` days, oldest first.
    /// Days without sessions are omitted.
    pub fn duration_trend(&self, days: u32) -> Result<Vec<TrendPoint>, DatabaseError> {
        let cutoff = (Utc::now() - Duration::days(i64::from(days))).to_rfc3339();
        let mut stmt = self.conn.prepare(
            "SELECT substr(completed_at, 1, 10), COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM sessions
             WHERE completed_at >= ?1
             GROUP BY substr(completed_at, 1, 10)
             ORDER BY substr(completed_at, 1, 10)",
        )?;
        let rows = stmt.query_map(params![cutoff], |row| {
            Ok(TrendPoint {
                day: row.get(0)?,
                sessions: row.get(1)?,
                total_duration_secs: row.get(2)?,
            })
        })?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row?);
        }
        Ok(points)
    }

    /// Session counts grouped by plan, busiest first.
    pub fn sessions_by_plan(&self) -> Result<Vec<PlanCount>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT plan_name, COUNT(*)
             FROM sessions
             GROUP BY plan_name
             ORDER BY COUNT(*) DESC, plan_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PlanCount {
                plan_name: row.get(0)?,
                sessions: row.get(1)?,
            })
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    // ── Key-value store ──────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(value) => Ok(Some(value?)),
            None => Ok(None),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
