//! Job submission and status queries.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use crate::error::{Error, Result, ValidationError};
use crate::types::{
    DirectPostRequest, Job, JobId, JobRequest, JobState, JobStatusView, JobSummary,
    SUMMARY_TARGET, StatusRecord, TargetResult, TargetStatusView,
};

use super::Publisher;

impl Publisher {
    /// Validate and accept a job request
    ///
    /// Returns once the job is recorded; dispatch continues on a background
    /// task and its outcome arrives through events and [`job_status`].
    ///
    /// # Errors
    ///
    /// [`Error::ShuttingDown`] after [`shutdown`] started, [`Error::Validation`]
    /// for a malformed request.
    ///
    /// [`job_status`]: Publisher::job_status
    /// [`shutdown`]: Publisher::shutdown
    pub async fn submit(&self, request: JobRequest) -> Result<JobId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        let job = Job::try_from(request)?;
        self.submit_job(job).await
    }

    /// Accept an already built job
    pub async fn submit_job(&self, job: Job) -> Result<JobId> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        self.orchestrator.validate(&job)?;

        if self.db.get_job(&job.id).await?.is_some() {
            return Err(ValidationError::DuplicateJobId(job.id.to_string()).into());
        }
        self.db.insert_job(&job.id, &job.targets).await?;

        let id = job.id.clone();
        tracing::info!(job_id = %id, targets = ?job.targets, "Job accepted");

        let publisher = self.clone();
        self.tasks.spawn(async move {
            publisher.run_job(job).await;
        });

        Ok(id)
    }

    /// Publish to one target and wait for its result
    ///
    /// The post is not a job: it gets no id, no events and no status records.
    ///
    /// # Errors
    ///
    /// [`Error::ShuttingDown`], [`Error::Validation`], and
    /// [`Error::UnknownTarget`] or [`Error::TargetNotConfigured`] when no
    /// adapter serves `target`. A platform failure is returned as
    /// [`TargetResult::Failure`].
    pub async fn publish_direct(
        &self,
        target: &str,
        request: DirectPostRequest,
    ) -> Result<TargetResult> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        let job = request.into_job(target)?;
        self.orchestrator.publish_direct(&job).await
    }

    /// Blogs the configured Tumblr account can post to
    pub async fn tumblr_blogs(&self) -> Result<Vec<String>> {
        self.orchestrator.registry().tumblr()?.blog_names().await
    }

    async fn run_job(&self, job: Job) -> JobSummary {
        let summary = self.orchestrator.dispatch(&job).await;
        if let Err(e) = self.db.mark_job_state(&job.id, JobState::Completed).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to mark job completed");
        }
        summary
    }

    /// Everything known about a job
    ///
    /// Targets without a record yet are reported with a null status.
    pub async fn job_status(&self, id: &JobId) -> Result<JobStatusView> {
        let job = self
            .db
            .get_job(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

        let records: HashMap<String, StatusRecord> = self
            .db
            .get_statuses(id)
            .await?
            .into_iter()
            .map(|row| (row.target.clone(), StatusRecord::from(row)))
            .collect();

        let summary = records
            .get(SUMMARY_TARGET)
            .and_then(|record| record.data.clone())
            .and_then(|data| serde_json::from_value::<JobSummary>(data).ok());

        let targets = job
            .target_list()
            .iter()
            .map(|target| TargetStatusView::new(target.as_str(), records.get(target)))
            .collect();

        Ok(JobStatusView {
            id: job.job_id(),
            state: job.job_state(),
            targets,
            summary,
            created_at: job.created(),
            completed_at: job.completed(),
        })
    }
}
