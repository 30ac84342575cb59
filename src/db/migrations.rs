//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use super::Database;

/// Schema v1, applied in order inside one transaction
///
/// `target_status` has no foreign key to `jobs` so embedders can record
/// status for jobs that never went through the service.
const V1_STATEMENTS: &[(&str, &str)] = &[
    (
        "runtime_state table",
        r#"
        CREATE TABLE runtime_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    ),
    (
        "jobs table",
        r#"
        CREATE TABLE jobs (
            id TEXT PRIMARY KEY,
            targets TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'running',
            created_at INTEGER NOT NULL,
            completed_at INTEGER
        )
        "#,
    ),
    (
        "jobs state index",
        "CREATE INDEX idx_jobs_state ON jobs(state)",
    ),
    (
        "target_status table",
        r#"
        CREATE TABLE target_status (
            job_id TEXT NOT NULL,
            target TEXT NOT NULL,
            status TEXT NOT NULL,
            error TEXT,
            retry_at INTEGER,
            data TEXT,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (job_id, target)
        )
        "#,
    ),
];

/// Schema v2: `target_status.retry_at` moves from unix seconds to milliseconds
const V2_STATEMENTS: &[(&str, &str)] = &[(
    "retry_at to milliseconds",
    "UPDATE target_status SET retry_at = retry_at * 1000 WHERE retry_at IS NOT NULL",
)];

fn migration_error(step: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| {
        Error::Database(DatabaseError::MigrationFailed(format!(
            "{} failed: {}",
            step, e
        )))
    }
}

impl Database {
    /// Open (or create) the database at `path` and bring the schema up to date
    ///
    /// Missing parent directories are created. The pool runs in WAL mode.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "invalid database path {}: {}",
                    path.display(),
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "cannot open {}: {}",
                path.display(),
                e
            )))
        })?;

        let db = Self { pool };
        db.run_migrations().await?;
        tracing::debug!(path = %path.display(), "Database ready");

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "cannot acquire connection: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_error("schema_version table"))?;

        let current = sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(version) FROM schema_version")
            .fetch_optional(&mut *conn)
            .await
            .map_err(migration_error("schema version lookup"))?
            .flatten()
            .unwrap_or(0);

        if current < 1 {
            Self::apply(&mut conn, 1, V1_STATEMENTS).await?;
        }
        if current < 2 {
            Self::apply(&mut conn, 2, V2_STATEMENTS).await?;
        }

        Ok(())
    }

    /// Run `statements` and record `version`, all or nothing
    async fn apply(
        conn: &mut SqliteConnection,
        version: i64,
        statements: &[(&str, &str)],
    ) -> Result<()> {
        tracing::info!(version, "Applying database migration");

        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(migration_error("begin"))?;

        let result = async {
            for &(step, sql) in statements {
                sqlx::query(sql)
                    .execute(&mut *conn)
                    .await
                    .map_err(migration_error(step))?;
            }
            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().timestamp())
                .execute(&mut *conn)
                .await
                .map_err(migration_error("version record"))?;
            Ok::<(), Error>(())
        }
        .await;

        if let Err(e) = result {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(e);
        }

        sqlx::query("COMMIT")
            .execute(&mut *conn)
            .await
            .map_err(migration_error("commit"))?;

        tracing::info!(version, "Database migration complete");
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
