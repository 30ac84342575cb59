//! Adapter lookup by target identifier

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    AdapterCapabilities, BlueskyAdapter, TargetAdapter, TargetKind, ThreadsAdapter, TumblrAdapter,
    TwitterAdapter, canonical_id,
};
use crate::config::TargetsConfig;
use crate::error::{Error, Result};

/// Maps target identifiers to adapter instances
///
/// Built once from configuration and shared read-only across jobs. A known
/// platform without credentials is simply absent.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn TargetAdapter>>,
    tumblr: Option<Arc<TumblrAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every configured platform
    pub fn from_config(targets: &TargetsConfig, client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        if let Some(config) = &targets.tumblr {
            let tumblr = Arc::new(TumblrAdapter::new(client.clone(), config.clone()));
            registry.register(TargetKind::Tumblr.as_str(), tumblr.clone());
            registry.tumblr = Some(tumblr);
        }
        if let Some(config) = &targets.twitter {
            registry.register(
                TargetKind::Twitter.as_str(),
                Arc::new(TwitterAdapter::new(client.clone(), config.clone())),
            );
        }
        if let Some(config) = &targets.bluesky {
            registry.register(
                TargetKind::Bluesky.as_str(),
                Arc::new(BlueskyAdapter::new(client.clone(), config.clone())),
            );
        }
        if let Some(config) = &targets.threads {
            registry.register(
                TargetKind::Threads.as_str(),
                Arc::new(ThreadsAdapter::new(client, config.clone())),
            );
        }
        tracing::info!(targets = ?registry.identifiers(), "Adapters registered");
        registry
    }

    /// Register an adapter under `id`, replacing any previous one
    pub fn register(&mut self, id: &str, adapter: Arc<dyn TargetAdapter>) {
        self.adapters.insert(canonical_id(id), adapter);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_adapter(mut self, id: &str, adapter: Arc<dyn TargetAdapter>) -> Self {
        self.register(id, adapter);
        self
    }

    /// Adapter for `id`
    ///
    /// # Errors
    ///
    /// [`Error::TargetNotConfigured`] for a known platform without credentials,
    /// [`Error::UnknownTarget`] for anything else.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn TargetAdapter>> {
        if let Some(adapter) = self.adapters.get(&canonical_id(id)) {
            return Ok(adapter.clone());
        }
        match TargetKind::parse(id) {
            Some(kind) => Err(Error::TargetNotConfigured(kind.as_str().to_string())),
            None => Err(Error::UnknownTarget(id.to_string())),
        }
    }

    /// The configured Tumblr adapter, for account queries
    ///
    /// # Errors
    ///
    /// [`Error::TargetNotConfigured`] when Tumblr has no credentials.
    pub fn tumblr(&self) -> Result<Arc<TumblrAdapter>> {
        self.tumblr
            .clone()
            .ok_or_else(|| Error::TargetNotConfigured(TargetKind::Tumblr.as_str().to_string()))
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Registered identifiers with their capabilities, sorted
    pub fn capabilities(&self) -> Vec<(String, AdapterCapabilities)> {
        self.adapters
            .iter()
            .map(|(id, adapter)| (id.clone(), adapter.capabilities()))
            .collect()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
