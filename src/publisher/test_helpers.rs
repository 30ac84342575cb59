//! Shared helpers for creating Publisher instances in tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use crate::adapters::AdapterRegistry;
use crate::config::Config;
use crate::orchestrator::test_helpers::{Behavior, ScriptedAdapter};
use crate::publisher::Publisher;
use crate::types::{Event, JobId, JobSummary};

/// Config pointing at `dir`, without pacing
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("test.db");
    config.publish.inter_target_delay = Duration::ZERO;
    config.publish.target_timeout = Duration::from_millis(500);
    config.publish.shutdown_timeout = Duration::from_secs(2);
    config
}

/// Registry with "a" succeeding and "b" failing
pub(crate) fn scripted_registry() -> AdapterRegistry {
    AdapterRegistry::new()
        .with_adapter("a", Arc::new(ScriptedAdapter::new("a", Behavior::Succeed)))
        .with_adapter("b", Arc::new(ScriptedAdapter::new("b", Behavior::Fail("rejected"))))
}

/// Publisher over a fresh database; keep the tempdir alive
pub(crate) async fn create_test_publisher(
    registry: AdapterRegistry,
) -> (Publisher, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let publisher = Publisher::with_registry(test_config(temp_dir.path()), registry)
        .await
        .unwrap();
    (publisher, temp_dir)
}

/// Wait for the summary event of `job_id`
pub(crate) async fn wait_for_summary(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    job_id: &JobId,
) -> JobSummary {
    tokio::time::timeout(Duration::from_secs(5), async {
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
