//! Key/value runtime state, used for crash detection.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

const CLEAN_SHUTDOWN: &str = "clean_shutdown";

impl Database {
    /// Whether the previous run ended without [`set_clean_shutdown`](Self::set_clean_shutdown)
    ///
    /// A fresh database also answers true; it has no jobs to reconcile.
    pub async fn was_unclean_shutdown(&self) -> Result<bool> {
        Ok(self
            .runtime_value(CLEAN_SHUTDOWN)
            .await?
            .is_none_or(|v| v != "true"))
    }

    /// Arm crash detection for this run
    pub async fn set_clean_start(&self) -> Result<()> {
        self.set_runtime_value(CLEAN_SHUTDOWN, "false").await
    }

    /// Record that every job finished before exit
    pub async fn set_clean_shutdown(&self) -> Result<()> {
        self.set_runtime_value(CLEAN_SHUTDOWN, "true").await
    }

    async fn runtime_value(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM runtime_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to read runtime state {}: {}",
                    key, e
                )))
            })
    }

    async fn set_runtime_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write runtime state {}: {}",
                key, e
            )))
        })?;

        Ok(())
    }
}
