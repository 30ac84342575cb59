//! Common test utilities for publish-all integration tests

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use publish_all::adapters::{AdapterCapabilities, TargetAdapter};
use publish_all::content::PublishContent;
use publish_all::types::{TargetOptions, TargetResult};
use publish_all::{Config, Event, JobId, JobSummary, Publisher};

/// Config over a database in `dir`, without pacing
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("publish-all.db");
    config.publish.inter_target_delay = Duration::ZERO;
    config.publish.target_timeout = Duration::from_secs(2);
    config.publish.shutdown_timeout = Duration::from_secs(5);
    config
}

/// Adapter that answers every call with the same result and keeps what it saw
pub struct FixedAdapter {
    name: String,
    result: TargetResult,
    seen: Mutex<Vec<PublishContent>>,
}

impl FixedAdapter {
    /// Adapter named `name` that always returns `result`
    pub fn new(name: &str, result: TargetResult) -> Self {
        Self {
            name: name.to_string(),
            result,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Contents received so far
    #[allow(dead_code)]
    pub fn seen(&self) -> Vec<PublishContent> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetAdapter for FixedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::raw_bytes(None)
    }

    async fn publish(&self, content: &PublishContent, _options: &TargetOptions) -> TargetResult {
        self.seen.lock().unwrap().push(content.clone());
        self.result.clone()
    }
}

/// Wait for the summary event of `job_id`
pub async fn wait_for_summary(publisher: &Publisher, job_id: &JobId) -> JobSummary {
    let mut events = publisher.subscribe();
    // The job may already be over by the time we subscribe
    if let Ok(view) = publisher.job_status(job_id).await {
        if let Some(summary) = view.summary {
            return summary;
        }
    }
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.unwrap() {
                Event::Summary {
                    job_id: id,
                    summary,
                    ..
                } if &id == job_id => return summary,
                _ => continue,
            }
        }
    })
    .await
    .expect("summary event")
}
