//! Shutdown and crash reconciliation.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use crate::error::Result;
use crate::orchestrator::SummaryLedger;
use crate::types::{JobState, SUMMARY_TARGET, StatusRecord, TargetResult, TargetStatus};

use super::Publisher;

/// Failure reason for targets a crash left unattempted
pub const INTERRUPTED: &str = "interrupted";

impl Publisher {
    /// Gracefully shut down the publisher
    ///
    /// 1. Stops accepting new jobs
    /// 2. Waits up to `shutdown_timeout` for running jobs
    /// 3. Gives queued webhooks what is left of that time to go out
    /// 4. Marks a clean shutdown, but only when nothing is left running, so
    ///    the next start reconciles whatever was cut off
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        self.tasks.close();
        tracing::info!(active_jobs = self.tasks.len(), "Stopped accepting new jobs");

        let timeout = self.config.publish.shutdown_timeout;
        let deadline = tokio::time::Instant::now() + timeout;
        let finished = tokio::time::timeout(timeout, self.tasks.wait()).await;

        if let Some(webhooks) = &self.webhooks {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if !webhooks.flush(remaining).await {
                tracing::warn!("Webhook queue not drained before shutdown timeout");
            }
        }

        match finished {
            Ok(()) => {
                tracing::info!("All running jobs completed");
                self.db.set_clean_shutdown().await?;
                tracing::info!("Marked clean shutdown in database");
            }
            Err(_) => {
                tracing::warn!(
                    active_jobs = self.tasks.len(),
                    timeout_secs = timeout.as_secs(),
                    "Timeout waiting for jobs, leaving them for reconciliation on next start"
                );
            }
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Close out jobs that were still running when the process died
    ///
    /// Targets with a record keep their bucket, targets without one fail with
    /// [`INTERRUPTED`]. A job whose `_summary` was already written only needs
    /// its state fixed. Returns the number of jobs touched.
    pub(crate) async fn reconcile_interrupted_jobs(&self) -> Result<usize> {
        let jobs = self.db.list_incomplete_jobs().await?;
        if jobs.is_empty() {
            tracing::debug!("No interrupted jobs to reconcile");
            return Ok(0);
        }

        for job in &jobs {
            let id = job.job_id();
            let records: HashMap<String, StatusRecord> = self
                .db
                .get_statuses(&id)
                .await?
                .into_iter()
                .map(|row| (row.target.clone(), StatusRecord::from(row)))
                .collect();

            if records.contains_key(SUMMARY_TARGET) {
                self.db.mark_job_state(&id, JobState::Completed).await?;
                tracing::info!(job_id = %id, "Job had finished before the crash");
                continue;
            }

            let targets = job.target_list();
            let mut ledger = SummaryLedger::new(targets.len());
            for target in &targets {
                let result = match records.get(target) {
                    Some(record) => result_from_record(record),
                    None => {
                        let result = TargetResult::failure(INTERRUPTED, true);
                        self.db
                            .upsert_status(&id, target, &StatusRecord::from_result(&result))
                            .await?;
                        result
                    }
                };
                ledger.record(target, &result);
            }

            let summary = ledger.finish();
            self.db
                .upsert_status(&id, SUMMARY_TARGET, &StatusRecord::from_summary(&summary))
                .await?;
            self.db.mark_job_state(&id, JobState::Interrupted).await?;
            tracing::info!(
                job_id = %id,
                successful = summary.successful_targets.len(),
                failed = summary.failed_targets.len(),
                "Reconciled interrupted job"
            );
        }

        Ok(jobs.len())
    }
}

fn result_from_record(record: &StatusRecord) -> TargetResult {
    match (record.status, record.retry_at) {
        (TargetStatus::Error, _) => {
            TargetResult::failure(record.error.clone().unwrap_or_default(), false)
        }
        (TargetStatus::Scheduled, Some(retry_at)) => TargetResult::Scheduled {
            retry_at,
            data: serde_json::Value::Null,
        },
        _ => TargetResult::success(),
    }
}
