//! Service facade
//!
//! [`Publisher`] wires configuration into the database, adapter registry,
//! image host, notifiers and orchestrator, and runs accepted jobs on
//! background tasks:
//! - [`jobs`] - Submission and status queries
//! - [`lifecycle`] - Shutdown and crash reconciliation

mod jobs;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use lifecycle::INTERRUPTED;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Serialize;
use tokio_util::task::TaskTracker;
use utoipa::ToSchema;

use crate::adapters::{AdapterCapabilities, AdapterRegistry};
use crate::config::Config;
use crate::content::ImagePreparer;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::image_host::{CloudinaryImageHost, ImageHost};
use crate::notify::{BroadcastNotifier, NotifierSet, WebhookNotifier};
use crate::orchestrator::{JobOrchestrator, OrchestratorSettings};
use crate::types::Event;

/// A configured target and what it accepts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Canonical identifier
    pub id: String,
    /// Image transport and limits
    pub capabilities: AdapterCapabilities,
}

/// Publishing service (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Publisher {
    /// Database instance for persistence
    /// Public for integration tests to query job status
    pub db: Arc<Database>,
    /// Live event channel shared with SSE subscribers
    pub(crate) events: BroadcastNotifier,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Dispatch engine shared by every job
    pub(crate) orchestrator: JobOrchestrator,
    /// Running jobs, awaited on shutdown
    pub(crate) tasks: TaskTracker,
    /// Webhook queue, drained on shutdown
    pub(crate) webhooks: Option<Arc<WebhookNotifier>>,
    /// Set to false during shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl Publisher {
    /// Create a publisher with adapters for every configured platform
    ///
    /// Opens (or creates) the SQLite database, runs migrations and, after an
    /// unclean shutdown, reconciles jobs that never finished.
    pub async fn new(config: Config) -> Result<Self> {
        let client = http_client()?;
        let registry = AdapterRegistry::from_config(&config.targets, client.clone());
        Self::build(config, registry, client).await
    }

    /// Create a publisher with a caller-supplied adapter registry
    ///
    /// Credentials in `config.targets` are ignored.
    pub async fn with_registry(config: Config, registry: AdapterRegistry) -> Result<Self> {
        let client = http_client()?;
        Self::build(config, registry, client).await
    }

    async fn build(config: Config, registry: AdapterRegistry, client: reqwest::Client) -> Result<Self> {
        let db = Database::new(&config.persistence.database_path).await?;
        let unclean = db.was_unclean_shutdown().await?;
        db.set_clean_start().await?;
        let db = Arc::new(db);

        let events = BroadcastNotifier::with_capacity(config.publish.event_buffer.max(1));
        let mut notifiers = NotifierSet::new().with(Arc::new(events.clone()));
        let webhooks = (!config.notifications.webhooks.is_empty()).then(|| {
            Arc::new(WebhookNotifier::new(
                client.clone(),
                config.notifications.webhooks.clone(),
            ))
        });
        if let Some(webhooks) = &webhooks {
            notifiers = notifiers.with(webhooks.clone());
        }

        let host = config.image_host.cloudinary.clone().map(|cloudinary| {
            Arc::new(CloudinaryImageHost::new(client.clone(), cloudinary)) as Arc<dyn ImageHost>
        });
        match &host {
            Some(host) => tracing::info!(image_host = host.name(), "Image host configured"),
            None => tracing::info!("No image host configured, hosted-URL targets cannot take images"),
        }
        let preparer = ImagePreparer::new(host, config.image_host.retry.clone());

        let orchestrator = JobOrchestrator::new(
            Arc::new(registry),
            preparer,
            db.clone(),
            Arc::new(notifiers),
            OrchestratorSettings::from(&config.publish),
        );

        let publisher = Self {
            db,
            events,
            config: Arc::new(config),
            orchestrator,
            tasks: TaskTracker::new(),
            webhooks,
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        if unclean {
            let reconciled = publisher.reconcile_interrupted_jobs().await?;
            if reconciled > 0 {
                tracing::warn!(reconciled, "Reconciled jobs interrupted by an unclean shutdown");
            }
        }

        Ok(publisher)
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls more than `event_buffer` events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Configured targets, sorted by identifier
    pub fn targets(&self) -> Vec<TargetInfo> {
        self.orchestrator
            .registry()
            .capabilities()
            .into_iter()
            .map(|(id, capabilities)| TargetInfo { id, capabilities })
            .collect()
    }

    /// Number of jobs still dispatching
    pub fn active_jobs(&self) -> usize {
        self.tasks.len()
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("publish-all/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::Network)
}
