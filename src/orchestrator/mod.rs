//! Multi-target job orchestration
//!
//! [`JobOrchestrator`] takes one [`Job`] through
//! `Validating -> Preparing -> Dispatching(1..N) -> Completed`:
//!
//! 1. validation rejects a job before any side effect,
//! 2. images for hosted-URL targets are uploaded once,
//! 3. targets are dispatched one at a time in caller order, each result
//!    producing one progress event and one status record,
//! 4. a summary event and a `_summary` record close the job.
//!
//! A failing, panicking or hanging adapter only fails its own target.
//! Recorder and notifier failures are logged and never stop the loop.

use std::collections::{BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::adapters::{AdapterRegistry, ImageDelivery, TargetAdapter, canonical_id};
use crate::config::PublishConfig;
use crate::content::{ImagePreparer, PreparedImages, PublishContent};
use crate::error::{Error, Result, ValidationError};
use crate::notify::ProgressNotifier;
use crate::status::StatusRecorder;
use crate::types::{
    Event, Job, JobSummary, SUMMARY_TARGET, StatusRecord, SummaryStatus, TargetOptions,
    TargetResult,
};

mod ledger;

pub use ledger::{SummaryLedger, percent_complete};

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
mod tests;

/// Reason reported for hosted-URL targets when image uploads failed
pub const UPLOAD_FAILED: &str = "upload failed";

/// Dispatch pacing
#[derive(Clone, Copy, Debug)]
pub struct OrchestratorSettings {
    /// Pause after a successful or scheduled target when more remain
    pub inter_target_delay: Duration,
    /// Upper bound on one adapter call
    pub target_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&PublishConfig::default())
    }
}

impl From<&PublishConfig> for OrchestratorSettings {
    fn from(config: &PublishConfig) -> Self {
        Self {
            inter_target_delay: config.inter_target_delay,
            target_timeout: config.target_timeout,
        }
    }
}

/// Fans a job out to its targets
#[derive(Clone)]
pub struct JobOrchestrator {
    registry: Arc<AdapterRegistry>,
    preparer: ImagePreparer,
    recorder: Arc<dyn StatusRecorder>,
    notifier: Arc<dyn ProgressNotifier>,
    settings: OrchestratorSettings,
}

impl JobOrchestrator {
    /// Wire an orchestrator from its collaborators
    pub fn new(
        registry: Arc<AdapterRegistry>,
        preparer: ImagePreparer,
        recorder: Arc<dyn StatusRecorder>,
        notifier: Arc<dyn ProgressNotifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry,
            preparer,
            recorder,
            notifier,
            settings,
        }
    }

    /// Adapter registry in use
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Check a job without side effects
    ///
    /// Targets that do not resolve to an adapter pass here and fail
    /// individually during dispatch.
    pub fn validate(&self, job: &Job) -> std::result::Result<(), ValidationError> {
        if job.targets.is_empty() {
            return Err(ValidationError::NoTargets);
        }

        let mut seen = HashSet::new();
        for (index, target) in job.targets.iter().enumerate() {
            if target.trim().is_empty() {
                return Err(ValidationError::EmptyTarget { index });
            }
            let id = canonical_id(target);
            if id == SUMMARY_TARGET {
                return Err(ValidationError::ReservedTarget(target.clone()));
            }
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateTarget(target.clone()));
            }
        }

        for target in &job.targets {
            if let Ok(adapter) = self.registry.resolve(target) {
                adapter.validate_options(&job.options_for(target))?;
            }
        }
        Ok(())
    }

    /// Validate, then dispatch every target and return the summary
    pub async fn run(&self, job: &Job) -> std::result::Result<JobSummary, ValidationError> {
        if let Err(e) = self.validate(job) {
            tracing::info!(job_id = %job.id, error = %e, "Job rejected");
            return Err(e);
        }
        Ok(self.dispatch(job).await)
    }

    /// Publish to the job's only target and return the adapter's result
    ///
    /// Images are hosted first when the adapter needs URLs. Nothing is
    /// emitted or recorded.
    ///
    /// # Errors
    ///
    /// Validation errors, [`Error::UnknownTarget`] or
    /// [`Error::TargetNotConfigured`] when no adapter serves the target.
    pub async fn publish_direct(&self, job: &Job) -> Result<TargetResult> {
        self.validate(job)?;
        let target = match job.targets.as_slice() {
            [target] => target,
            _ => return Err(Error::Other("direct publish takes exactly one target".into())),
        };
        let adapter = self.registry.resolve(target)?;

        let routed: [Result<Arc<dyn TargetAdapter>>; 1] = [Ok(adapter.clone())];
        let prepared = self.prepare_images(job, &routed).await;
        let result = self
            .publish_to(job, target, &adapter, prepared.as_ref())
            .await;
        match &result {
            TargetResult::Failure { reason, .. } => {
                tracing::warn!(target = %target, error = %reason, "Direct publish failed")
            }
            other => tracing::info!(
                target = %target,
                status = other.status().as_str(),
                "Direct publish done"
            ),
        }
        Ok(result)
    }

    /// Dispatch an already validated job
    pub(crate) async fn dispatch(&self, job: &Job) -> JobSummary {
        let total = job.targets.len();
        tracing::info!(job_id = %job.id, targets = total, images = job.images.len(), "Publishing job");

        let adapters: Vec<Result<Arc<dyn TargetAdapter>>> = job
            .targets
            .iter()
            .map(|target| self.registry.resolve(target))
            .collect();

        let prepared = self.prepare_images(job, &adapters).await;

        let mut ledger = SummaryLedger::new(total);
        for (index, (target, adapter)) in job.targets.iter().zip(&adapters).enumerate() {
            let result = match adapter {
                Ok(adapter) => self.publish_to(job, target, adapter, prepared.as_ref()).await,
                Err(e) => {
                    tracing::warn!(job_id = %job.id, target = %target, error = %e, "Target unavailable");
                    TargetResult::failure(e.to_string(), false)
                }
            };

            let progress = ledger.record(target, &result);
            match &result {
                TargetResult::Failure { reason, retriable } => tracing::warn!(
                    job_id = %job.id,
                    target = %target,
                    progress,
                    retriable,
                    error = %reason,
                    "Target failed"
                ),
                other => tracing::info!(
                    job_id = %job.id,
                    target = %target,
                    progress,
                    status = other.status().as_str(),
                    "Target published"
                ),
            }

            let (error, retry_at) = match &result {
                TargetResult::Failure { reason, .. } => (Some(reason.clone()), None),
                TargetResult::Scheduled { retry_at, .. } => (None, Some(*retry_at)),
                TargetResult::Success { .. } => (None, None),
            };
            self.emit(&Event::Progress {
                job_id: job.id.clone(),
                target: target.clone(),
                status: result.status(),
                progress,
                error,
                retry_at,
            })
            .await;
            self.record(job, target, &StatusRecord::from_result(&result))
                .await;

            if result.is_success()
                && ledger.remaining() > 0
                && !self.settings.inter_target_delay.is_zero()
            {
                tokio::time::sleep(self.settings.inter_target_delay).await;
            }
        }

        let summary = ledger.finish();
        tracing::info!(
            job_id = %job.id,
            successful = summary.successful_targets.len(),
            failed = summary.failed_targets.len(),
            "Job completed"
        );
        self.emit(&Event::Summary {
            job_id: job.id.clone(),
            status: SummaryStatus::Completed,
            summary: summary.clone(),
        })
        .await;
        self.record(job, SUMMARY_TARGET, &StatusRecord::from_summary(&summary))
            .await;

        summary
    }

    /// Upload images routed to hosted-URL targets
    ///
    /// `None` means the batch failed; dependent targets fail individually.
    async fn prepare_images(
        &self,
        job: &Job,
        adapters: &[Result<Arc<dyn TargetAdapter>>],
    ) -> Option<PreparedImages> {
        let mut needed = BTreeSet::new();
        for (target, adapter) in job.targets.iter().zip(adapters) {
            let Ok(adapter) = adapter else { continue };
            let caps = adapter.capabilities();
            if caps.image_delivery == ImageDelivery::HostedUrl {
                let content = PublishContent::for_target(job, target, caps.max_images);
                needed.extend(content.images.iter().map(|image| image.index));
            }
        }

        match self.preparer.prepare(&job.images, &needed).await {
            Ok(prepared) => {
                if !prepared.is_empty() {
                    tracing::debug!(job_id = %job.id, hosted = prepared.len(), "Images hosted");
                }
                Some(prepared)
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Image upload failed");
                None
            }
        }
    }

    async fn publish_to(
        &self,
        job: &Job,
        target: &str,
        adapter: &Arc<dyn TargetAdapter>,
        prepared: Option<&PreparedImages>,
    ) -> TargetResult {
        let caps = adapter.capabilities();
        let mut content = PublishContent::for_target(job, target, caps.max_images);

        if caps.image_delivery == ImageDelivery::HostedUrl && !content.images.is_empty() {
            let Some(prepared) = prepared else {
                return TargetResult::failure(UPLOAD_FAILED, true);
            };
            content = match content.with_hosted_urls(prepared) {
                Ok(content) => content,
                Err(_) => return TargetResult::failure(UPLOAD_FAILED, true),
            };
        }

        tracing::debug!(
            job_id = %job.id,
            target = %target,
            images = content.images.len(),
            "Dispatching target"
        );
        self.invoke(adapter.as_ref(), &content, &job.options_for(target))
            .await
    }

    /// Adapter call with panic and timeout containment
    async fn invoke(
        &self,
        adapter: &dyn TargetAdapter,
        content: &PublishContent,
        options: &TargetOptions,
    ) -> TargetResult {
        let call = AssertUnwindSafe(adapter.publish(content, options)).catch_unwind();
        match tokio::time::timeout(self.settings.target_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                TargetResult::failure(format!("adapter panicked: {}", message), false)
            }
            Err(_) => TargetResult::failure(
                format!(
                    "timed out after {}ms",
                    self.settings.target_timeout.as_millis()
                ),
                true,
            ),
        }
    }

    async fn emit(&self, event: &Event) {
        if let Err(e) = self.notifier.emit(event).await {
            tracing::warn!(
                job_id = %event.job_id(),
                event = event.name(),
                error = %e,
                "Failed to emit event"
            );
        }
    }

    async fn record(&self, job: &Job, target: &str, record: &StatusRecord) {
        if let Err(e) = self.recorder.record(&job.id, target, record).await {
            tracing::warn!(job_id = %job.id, target = %target, error = %e, "Failed to record status");
        }
    }
}
