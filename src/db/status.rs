//! Per-target status records.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::status::StatusRecorder;
use crate::types::{JobId, StatusRecord};
use crate::{Error, Result};

use super::{Database, TargetStatusRow};

impl Database {
    /// Insert or replace the record for `(job_id, target)`
    pub async fn upsert_status(
        &self,
        job_id: &JobId,
        target: &str,
        record: &StatusRecord,
    ) -> Result<()> {
        let data = record
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO target_status (job_id, target, status, error, retry_at, data, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id, target) DO UPDATE SET
                status = excluded.status,
                error = excluded.error,
                retry_at = excluded.retry_at,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(job_id.as_str())
        .bind(target)
        .bind(record.status.as_str())
        .bind(&record.error)
        .bind(record.retry_at.map(|t| t.timestamp_millis()))
        .bind(data)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert status for {}: {}",
                target, e
            )))
        })?;

        Ok(())
    }

    /// All records for a job, including `_summary`
    pub async fn get_statuses(&self, job_id: &JobId) -> Result<Vec<TargetStatusRow>> {
        let rows = sqlx::query_as::<_, TargetStatusRow>(
            r#"
            SELECT job_id, target, status, error, retry_at, data, updated_at
            FROM target_status WHERE job_id = ?
            ORDER BY updated_at ASC, target ASC
            "#,
        )
        .bind(job_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get statuses: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}

#[async_trait]
impl StatusRecorder for Database {
    async fn record(&self, job_id: &JobId, target: &str, record: &StatusRecord) -> Result<()> {
        self.upsert_status(job_id, target, record).await
    }
}
