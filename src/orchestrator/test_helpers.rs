//! Scripted collaborators for orchestrator tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::{AdapterCapabilities, AdapterRegistry, TargetAdapter};
use crate::config::RetryConfig;
use crate::content::{ImagePreparer, PublishContent};
use crate::error::{Error, Result, ValidationError};
use crate::image_host::ImageHost;
use crate::notify::ProgressNotifier;
use crate::status::{MemoryStatusRecorder, StatusRecorder};
use crate::types::{Event, ImageData, JobId, StatusRecord, TargetOptions, TargetResult};

use super::{JobOrchestrator, OrchestratorSettings};

/// What a [`ScriptedAdapter`] does when called
#[derive(Clone, Debug)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    Schedule(chrono::DateTime<chrono::Utc>),
    Panic,
    Hang,
}

/// Adapter that follows a script and remembers what it received
pub struct ScriptedAdapter {
    name: String,
    behavior: Behavior,
    capabilities: AdapterCapabilities,
    required_option: Option<&'static str>,
    received: Mutex<Vec<PublishContent>>,
}

impl ScriptedAdapter {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            capabilities: AdapterCapabilities::raw_bytes(None),
            required_option: None,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: AdapterCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn requiring(mut self, option: &'static str) -> Self {
        self.required_option = Some(option);
        self
    }

    pub fn received(&self) -> Vec<PublishContent> {
        self.received.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl TargetAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> AdapterCapabilities {
        self.capabilities
    }

    fn validate_options(&self, options: &TargetOptions) -> std::result::Result<(), ValidationError> {
        match self.required_option {
            Some(option) if options.str(option).is_none() => {
                Err(ValidationError::MissingTargetOption {
                    target: self.name.clone(),
                    option: option.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    async fn publish(&self, content: &PublishContent, _options: &TargetOptions) -> TargetResult {
        self.received.lock().unwrap().push(content.clone());
        match &self.behavior {
            Behavior::Succeed => TargetResult::Success {
                data: serde_json::json!({ "target": self.name }),
            },
            Behavior::Fail(reason) => TargetResult::failure(*reason, false),
            Behavior::Schedule(retry_at) => TargetResult::Scheduled {
                retry_at: *retry_at,
                data: serde_json::Value::Null,
            },
            Behavior::Panic => panic!("{} blew up", self.name),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                TargetResult::success()
            }
        }
    }
}

/// Collects every emitted event
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressNotifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn emit(&self, event: &Event) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Notifier that always errors
pub struct FailingNotifier;

#[async_trait]
impl ProgressNotifier for FailingNotifier {
    fn name(&self) -> &str {
        "failing"
    }

    async fn emit(&self, _event: &Event) -> Result<()> {
        Err(Error::Other("socket closed".into()))
    }
}

/// Recorder that always errors
pub struct FailingRecorder;

#[async_trait]
impl StatusRecorder for FailingRecorder {
    async fn record(&self, _job_id: &JobId, _target: &str, _record: &StatusRecord) -> Result<()> {
        Err(Error::Other("store unavailable".into()))
    }
}

/// Image host that returns `https://img.test/<n>` or fails when told to
pub struct StubHost {
    pub fail: bool,
    uploads: Mutex<usize>,
}

impl StubHost {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            uploads: Mutex::new(0),
        }
    }

    pub fn uploads(&self) -> usize {
        *self.uploads.lock().unwrap()
    }
}

#[async_trait]
impl ImageHost for StubHost {
    fn name(&self) -> &str {
        "stub"
    }

    async fn upload(&self, _image: &ImageData) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        *uploads += 1;
        if self.fail {
            return Err(Error::platform("stub", Some(400), "rejected"));
        }
        Ok(format!("https://img.test/{}", *uploads))
    }
}

/// Settings without pacing and with a short adapter timeout
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        inter_target_delay: Duration::ZERO,
        target_timeout: Duration::from_millis(200),
    }
}

/// Retry policy with a single attempt
pub fn no_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 0,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        backoff_multiplier: 1.0,
        jitter: false,
    }
}

/// Orchestrator wired to in-memory collaborators
pub struct Harness {
    pub orchestrator: JobOrchestrator,
    pub notifier: Arc<RecordingNotifier>,
    pub recorder: Arc<MemoryStatusRecorder>,
}

impl Harness {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self::build(registry, None, fast_settings())
    }

    pub fn with_host(registry: AdapterRegistry, host: Arc<StubHost>) -> Self {
        Self::build(registry, Some(host as Arc<dyn ImageHost>), fast_settings())
    }

    pub fn with_settings(registry: AdapterRegistry, settings: OrchestratorSettings) -> Self {
        Self::build(registry, None, settings)
    }

    fn build(
        registry: AdapterRegistry,
        host: Option<Arc<dyn ImageHost>>,
        settings: OrchestratorSettings,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let recorder = Arc::new(MemoryStatusRecorder::new());
        let orchestrator = JobOrchestrator::new(
            Arc::new(registry),
            ImagePreparer::new(host, no_retry()),
            recorder.clone(),
            notifier.clone(),
            settings,
        );
        Self {
            orchestrator,
            notifier,
            recorder,
        }
    }
}

/// A small JPEG-typed payload
pub fn image(byte: u8) -> ImageData {
    ImageData::new("image/jpeg", vec![byte; 8])
}
