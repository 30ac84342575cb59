//! Database layer for publish-all
//!
//! Handles SQLite persistence for jobs and per-target status.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`jobs`] - Job rows and lifecycle state
//! - [`status`] - Per-target status records (the durable [`StatusRecorder`])
//! - [`state`] - Runtime state (shutdown tracking)
//!
//! [`StatusRecorder`]: crate::status::StatusRecorder

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

use crate::types::{JobId, JobState, StatusRecord, TargetStatus};

mod jobs;
mod migrations;
mod state;
mod status;

/// Job record from database
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    /// Job id
    pub id: String,
    /// JSON array of target identifiers in dispatch order
    pub targets: String,
    /// Lifecycle state ("running", "completed", "interrupted")
    pub state: String,
    /// Unix timestamp when the job was accepted
    pub created_at: i64,
    /// Unix timestamp when the job finished or was reconciled
    pub completed_at: Option<i64>,
}

impl JobRow {
    /// Job id
    pub fn job_id(&self) -> JobId {
        JobId::from(self.id.as_str())
    }

    /// Decoded lifecycle state
    pub fn job_state(&self) -> JobState {
        JobState::from_db(&self.state)
    }

    /// Decoded target list; a corrupt column decodes as empty
    pub fn target_list(&self) -> Vec<String> {
        serde_json::from_str(&self.targets).unwrap_or_default()
    }

    /// Acceptance time
    pub fn created(&self) -> DateTime<Utc> {
        timestamp(self.created_at)
    }

    /// Completion time
    pub fn completed(&self) -> Option<DateTime<Utc>> {
        self.completed_at.map(timestamp)
    }
}

/// Target status record from database
#[derive(Debug, Clone, FromRow)]
pub struct TargetStatusRow {
    /// Job id
    pub job_id: String,
    /// Target identifier as submitted, or `_summary`
    pub target: String,
    /// "success", "error" or "scheduled"
    pub status: String,
    /// Failure reason
    pub error: Option<String>,
    /// Scheduled publication time in unix milliseconds
    pub retry_at: Option<i64>,
    /// JSON platform response or summary
    pub data: Option<String>,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

impl From<TargetStatusRow> for StatusRecord {
    fn from(row: TargetStatusRow) -> Self {
        StatusRecord {
            status: TargetStatus::from_db(&row.status),
            error: row.error,
            retry_at: row.retry_at.and_then(DateTime::<Utc>::from_timestamp_millis),
            data: row.data.and_then(|d| serde_json::from_str(&d).ok()),
        }
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

/// Database handle for publish-all
pub struct Database {
    pool: SqlitePool,
}
