//! Live progress notification
//!
//! [`ProgressNotifier`] is the sink the orchestrator emits events to.
//! [`BroadcastNotifier`] feeds in-process subscribers (the SSE endpoint),
//! [`WebhookNotifier`] forwards events over HTTP, and [`NotifierSet`] fans an
//! event out to several sinks, logging each sink's failure on its own.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::Event;

mod webhooks;

pub use webhooks::WebhookNotifier;

/// Receives job events in emission order
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    /// Name for logs
    fn name(&self) -> &str;

    /// Deliver one event
    async fn emit(&self, event: &Event) -> Result<()>;
}

/// Publishes events on a tokio broadcast channel
///
/// Sending with no subscribers is not an error.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Event>,
}

impl BroadcastNotifier {
    /// Wrap an existing sender
    pub fn new(tx: broadcast::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Create a channel with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// New receiver for events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl ProgressNotifier for BroadcastNotifier {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn emit(&self, event: &Event) -> Result<()> {
        // No receivers is fine
        self.tx.send(event.clone()).ok();
        Ok(())
    }
}

/// Several sinks behind one notifier
#[derive(Clone, Default)]
pub struct NotifierSet {
    sinks: Vec<Arc<dyn ProgressNotifier>>,
}

impl NotifierSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn ProgressNotifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl ProgressNotifier for NotifierSet {
    fn name(&self) -> &str {
        "set"
    }

    async fn emit(&self, event: &Event) -> Result<()> {
        for sink in &self.sinks {
            if let Err(e) = sink.emit(event).await {
                tracing::warn!(
                    sink = sink.name(),
                    job_id = %event.job_id(),
                    event = event.name(),
                    error = %e,
                    "Notifier failed"
                );
            }
        }
        Ok(())
    }
}
