//! Job rows and lifecycle state.

use crate::error::DatabaseError;
use crate::types::{JobId, JobState};
use crate::{Error, Result};

use super::{Database, JobRow};

impl Database {
    /// Insert a newly accepted job in the `running` state
    pub async fn insert_job(&self, id: &JobId, targets: &[String]) -> Result<()> {
        let targets = serde_json::to_string(targets)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO jobs (id, targets, state, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(&targets)
        .bind(JobState::Running.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert job: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Move a job to `state`
    ///
    /// Terminal states stamp `completed_at`.
    pub async fn mark_job_state(&self, id: &JobId, state: JobState) -> Result<()> {
        let completed_at = match state {
            JobState::Running => None,
            JobState::Completed | JobState::Interrupted => Some(chrono::Utc::now().timestamp()),
        };

        let result = sqlx::query(
            r#"
            UPDATE jobs SET state = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(completed_at)
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update job state: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("job {}", id)));
        }
        Ok(())
    }

    /// Get a job by id
    pub async fn get_job(&self, id: &JobId) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, targets, state, created_at, completed_at
            FROM jobs WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get job: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Jobs still marked `running`, oldest first
    pub async fn list_incomplete_jobs(&self) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, targets, state, created_at, completed_at
            FROM jobs WHERE state = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(JobState::Running.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list incomplete jobs: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
