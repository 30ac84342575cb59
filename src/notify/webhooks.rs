//! Webhook delivery of job events

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::ProgressNotifier;
use crate::config::{WebhookConfig, WebhookEvent};
use crate::error::{Error, Result};
use crate::types::{Event, TargetStatus};

enum Queued {
    Event(Event),
    Flush(oneshot::Sender<()>),
}

/// POSTs event JSON to every webhook subscribed to the event kind
///
/// [`emit`](ProgressNotifier::emit) only queues the event. A background task
/// delivers the queue one request at a time, so a receiver sees a job's
/// events in order while a slow receiver never holds up dispatch. Each
/// request is bounded by its webhook's timeout; failures are logged.
pub struct WebhookNotifier {
    queue: mpsc::UnboundedSender<Queued>,
    webhooks: Arc<Vec<WebhookConfig>>,
}

impl WebhookNotifier {
    /// Create a notifier for the configured webhooks and start its delivery task
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(client: reqwest::Client, webhooks: Vec<WebhookConfig>) -> Self {
        let webhooks = Arc::new(webhooks);
        let (queue, rx) = mpsc::unbounded_channel();
        let delivery = Delivery {
            client,
            webhooks: webhooks.clone(),
        };
        tokio::spawn(delivery.run(rx));
        Self { queue, webhooks }
    }

    /// Wait until everything queued so far has been delivered or given up on
    ///
    /// Returns false when `timeout` elapsed first.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.queue.send(Queued::Flush(done_tx)).is_err() {
            return true;
        }
        matches!(tokio::time::timeout(timeout, done_rx).await, Ok(Ok(())))
    }

    fn subscribed(webhook: &WebhookConfig, event: &Event) -> bool {
        webhook.events.iter().any(|kind| match (kind, event) {
            (WebhookEvent::OnProgress, Event::Progress { .. }) => true,
            (WebhookEvent::OnTargetFailed, Event::Progress { status, .. }) => {
                *status == TargetStatus::Error
            }
            (WebhookEvent::OnCompleted, Event::Summary { .. }) => true,
            _ => false,
        })
    }
}

/// Owned by the delivery task
struct Delivery {
    client: reqwest::Client,
    webhooks: Arc<Vec<WebhookConfig>>,
}

impl Delivery {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Queued>) {
        while let Some(item) = rx.recv().await {
            match item {
                Queued::Event(event) => self.deliver_all(&event).await,
                Queued::Flush(done) => {
                    done.send(()).ok();
                }
            }
        }
        tracing::debug!("Webhook queue closed");
    }

    async fn deliver_all(&self, event: &Event) {
        let subscribed = self
            .webhooks
            .iter()
            .filter(|w| WebhookNotifier::subscribed(w, event));
        for webhook in subscribed {
            match self.deliver(webhook, event).await {
                Ok(()) => tracing::debug!(url = %webhook.url, event = event.name(), "webhook sent"),
                Err(e) => tracing::warn!(
                    url = %webhook.url,
                    job_id = %event.job_id(),
                    event = event.name(),
                    error = %e,
                    "webhook failed"
                ),
            }
        }
    }

    async fn deliver(&self, webhook: &WebhookConfig, event: &Event) -> Result<()> {
        let mut request = self
            .client
            .post(&webhook.url)
            .header("X-Event-Name", event.name())
            .json(event)
            .timeout(webhook.timeout);
        if let Some(auth) = &webhook.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = tokio::time::timeout(webhook.timeout, request.send())
            .await
            .map_err(|_| {
                Error::Other(format!(
                    "webhook timed out after {}ms",
                    webhook.timeout.as_millis()
                ))
            })??;

        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "webhook returned status {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressNotifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhooks"
    }

    async fn emit(&self, event: &Event) -> Result<()> {
        if !self.webhooks.iter().any(|w| Self::subscribed(w, event)) {
            return Ok(());
        }
        self.queue
            .send(Queued::Event(event.clone()))
            .map_err(|_| Error::Other("webhook delivery task stopped".to_string()))
    }
}
