//! Core types for publish-all

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Reserved target name for the per-job summary status record
pub const SUMMARY_TARGET: &str = "_summary";

/// Unique identifier for a publish job
///
/// Either the caller's correlation id or a generated UUID v4.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded image payload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    /// MIME type, e.g. "image/png"
    pub mime_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

impl ImageData {
    /// Create an image from raw bytes
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Hex SHA-256 of the bytes; identical images share a digest
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(&self.bytes);
        hash.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Re-encode as `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// File extension guessed from the MIME type
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An image plus the targets it is meant for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Shared payload; cloning an attachment never copies bytes
    pub data: Arc<ImageData>,
    /// Target identifiers this image is restricted to (empty = all targets)
    pub affinity: Vec<String>,
}

impl ImageAttachment {
    /// Image delivered to every target
    pub fn for_all(data: ImageData) -> Self {
        Self {
            data: Arc::new(data),
            affinity: Vec::new(),
        }
    }

    /// Image delivered only to the listed targets
    pub fn for_targets<I, S>(data: ImageData, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: Arc::new(data),
            affinity: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Opaque per-target configuration bag, interpreted by the adapter
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetOptions(pub serde_json::Map<String, serde_json::Value>);

impl TargetOptions {
    /// Non-blank string option
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Set an option, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

/// One publish request, immutable once submitted
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    /// Correlation key for status records and events
    pub id: JobId,
    /// Target identifiers in dispatch order
    pub targets: Vec<String>,
    /// Post text
    pub text: Option<String>,
    /// Images with their target affinity
    pub images: Vec<ImageAttachment>,
    /// Tags, formatted by each adapter
    pub tags: Vec<String>,
    /// Options keyed by target identifier
    pub target_options: HashMap<String, TargetOptions>,
}

impl Job {
    /// Create a job for the given targets with a generated id
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: JobId::generate(),
            targets: targets.into_iter().map(Into::into).collect(),
            text: None,
            images: Vec::new(),
            tags: Vec::new(),
            target_options: HashMap::new(),
        }
    }

    /// Use a specific id
    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the post text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append an image
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }

    /// Set the tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set options for one target
    pub fn with_options(mut self, target: impl Into<String>, options: TargetOptions) -> Self {
        self.target_options.insert(target.into(), options);
        self
    }

    /// Options for `target`, matched by canonical identifier
    pub fn options_for(&self, target: &str) -> TargetOptions {
        let wanted = crate::adapters::canonical_id(target);
        self.target_options
            .iter()
            .find(|(key, _)| crate::adapters::canonical_id(key) == wanted)
            .map(|(_, options)| options.clone())
            .unwrap_or_default()
    }
}

/// Image as submitted over the wire
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageInput {
    /// `data:<mime>;base64,<payload>`, or bare base64 (treated as JPEG)
    pub base64: String,

    /// Targets this image is restricted to (omitted or empty = all)
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// Job submission body
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// Target identifiers in dispatch order
    #[serde(default, alias = "platforms")]
    pub targets: Vec<String>,

    /// Post text
    #[serde(default)]
    pub text: Option<String>,

    /// Images
    #[serde(default)]
    pub images: Vec<ImageInput>,

    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Per-target options, e.g. `{"tumblr": {"blogName": "my-blog"}}`
    #[serde(default, alias = "platformOptions")]
    #[schema(value_type = Object)]
    pub target_options: HashMap<String, serde_json::Value>,

    /// Caller-supplied job id
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl TryFrom<JobRequest> for Job {
    type Error = ValidationError;

    fn try_from(request: JobRequest) -> Result<Self, Self::Error> {
        let id = match request.correlation_id {
            Some(id) if id.trim().is_empty() => return Err(ValidationError::InvalidCorrelationId),
            Some(id) => JobId(id.trim().to_string()),
            None => JobId::generate(),
        };

        let images = request
            .images
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                crate::content::data_url::decode_image(&input.base64)
                    .map(|data| ImageAttachment {
                        data: Arc::new(data),
                        affinity: input.platforms,
                    })
                    .map_err(|reason| ValidationError::InvalidImage { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let target_options = request
            .target_options
            .into_iter()
            .map(|(target, value)| {
                let map = match value {
                    serde_json::Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                (target, TargetOptions(map))
            })
            .collect();

        Ok(Job {
            id,
            targets: request.targets,
            text: request.text,
            images,
            tags: request.tags,
            target_options,
        })
    }
}

/// Body of a single-target post (`POST /{target}/post`)
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectPostRequest {
    /// Post text
    #[serde(default)]
    pub text: Option<String>,

    /// Images as data URLs or bare base64
    #[serde(default)]
    pub images: Vec<String>,

    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Tumblr blog, shorthand for `options.blogName`
    #[serde(default)]
    pub blog_name: Option<String>,

    /// Options for the target
    #[serde(default)]
    #[schema(value_type = Object)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl DirectPostRequest {
    /// One-target job carrying this post
    pub fn into_job(self, target: &str) -> Result<Job, ValidationError> {
        let mut options = self.options;
        if let Some(blog_name) = self.blog_name {
            options.insert("blogName".to_string(), serde_json::Value::String(blog_name));
        }

        let request = JobRequest {
            targets: vec![target.to_string()],
            text: self.text,
            images: self
                .images
                .into_iter()
                .map(|base64| ImageInput {
                    base64,
                    platforms: Vec::new(),
                })
                .collect(),
            tags: self.tags,
            target_options: HashMap::from([(
                target.to_string(),
                serde_json::Value::Object(options),
            )]),
            correlation_id: None,
        };
        Job::try_from(request)
    }
}

/// Outcome of one adapter call
#[derive(Clone, Debug, PartialEq)]
pub enum TargetResult {
    /// Published
    Success {
        /// Platform response details
        data: serde_json::Value,
    },
    /// Deferred by the platform; counts as a success
    Scheduled {
        /// When the post is expected to go out
        retry_at: DateTime<Utc>,
        /// Platform response details
        data: serde_json::Value,
    },
    /// Not published
    Failure {
        /// Human-readable reason
        reason: String,
        /// Whether another attempt might succeed
        retriable: bool,
    },
}

impl TargetResult {
    /// Success without details
    pub fn success() -> Self {
        TargetResult::Success {
            data: serde_json::Value::Null,
        }
    }

    /// Failure with a reason
    pub fn failure(reason: impl Into<String>, retriable: bool) -> Self {
        TargetResult::Failure {
            reason: reason.into(),
            retriable,
        }
    }

    /// Status reported in events and records
    pub fn status(&self) -> TargetStatus {
        match self {
            TargetResult::Success { .. } => TargetStatus::Success,
            TargetResult::Scheduled { .. } => TargetStatus::Scheduled,
            TargetResult::Failure { .. } => TargetStatus::Error,
        }
    }

    /// Success and Scheduled both count as succeeded
    pub fn is_success(&self) -> bool {
        !matches!(self, TargetResult::Failure { .. })
    }
}

/// Per-target status as reported to observers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// Published
    Success,
    /// Failed
    Error,
    /// Deferred by the platform
    Scheduled,
}

impl TargetStatus {
    /// Lowercase name stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Success => "success",
            TargetStatus::Error => "error",
            TargetStatus::Scheduled => "scheduled",
        }
    }

    /// Parse a stored name; unknown values decode as `Error`
    pub fn from_db(value: &str) -> Self {
        match value {
            "success" => TargetStatus::Success,
            "scheduled" => TargetStatus::Scheduled,
            _ => TargetStatus::Error,
        }
    }
}

/// A failed target and why
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailedTarget {
    /// Target identifier
    pub target: String,
    /// Failure reason
    pub reason: String,
}

/// Final result of a job; every target lands in exactly one bucket
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobSummary {
    /// Succeeded or scheduled targets in dispatch order
    #[serde(rename = "successful")]
    pub successful_targets: Vec<String>,
    /// Failed targets in dispatch order
    #[serde(rename = "failed")]
    pub failed_targets: Vec<FailedTarget>,
}

impl JobSummary {
    /// Number of targets accounted for
    pub fn total(&self) -> usize {
        self.successful_targets.len() + self.failed_targets.len()
    }
}

/// Terminal job status carried by summary events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    /// Every target was attempted
    Completed,
}

/// Live event emitted while a job runs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// One target finished
    #[serde(rename_all = "camelCase")]
    Progress {
        /// Job id
        job_id: JobId,
        /// Target identifier
        target: String,
        /// Outcome
        status: TargetStatus,
        /// Percent of targets attempted (1..=100)
        progress: u8,
        /// Failure reason
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// When a scheduled post goes out
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[schema(value_type = Option<String>)]
        retry_at: Option<DateTime<Utc>>,
    },
    /// Every target was attempted
    #[serde(rename_all = "camelCase")]
    Summary {
        /// Job id
        job_id: JobId,
        /// Always "completed"
        status: SummaryStatus,
        /// Buckets
        summary: JobSummary,
    },
}

impl Event {
    /// Event name used on named-event transports (SSE)
    pub fn name(&self) -> &'static str {
        match self {
            Event::Progress { .. } => "progressUpdate",
            Event::Summary { .. } => "taskCompleted",
        }
    }

    /// Job the event belongs to
    pub fn job_id(&self) -> &JobId {
        match self {
            Event::Progress { job_id, .. } | Event::Summary { job_id, .. } => job_id,
        }
    }
}

/// Durable status written per target and per job summary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Outcome
    pub status: TargetStatus,
    /// Failure reason, null on success
    pub error: Option<String>,
    /// When a scheduled post goes out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub retry_at: Option<DateTime<Utc>>,
    /// Platform response or summary details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

impl StatusRecord {
    /// Record for a finished target
    pub fn from_result(result: &TargetResult) -> Self {
        match result {
            TargetResult::Success { data } => Self {
                status: TargetStatus::Success,
                error: None,
                retry_at: None,
                data: Some(data.clone()).filter(|d| !d.is_null()),
            },
            TargetResult::Scheduled { retry_at, data } => Self {
                status: TargetStatus::Scheduled,
                error: None,
                retry_at: Some(*retry_at),
                data: Some(data.clone()).filter(|d| !d.is_null()),
            },
            TargetResult::Failure { reason, .. } => Self {
                status: TargetStatus::Error,
                error: Some(reason.clone()),
                retry_at: None,
                data: None,
            },
        }
    }

    /// `_summary` record; the status is `error` when any target failed
    pub fn from_summary(summary: &JobSummary) -> Self {
        let failed = !summary.failed_targets.is_empty();
        Self {
            status: if failed {
                TargetStatus::Error
            } else {
                TargetStatus::Success
            },
            error: failed.then(|| {
                summary
                    .failed_targets
                    .iter()
                    .map(|f| f.target.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
            retry_at: None,
            data: serde_json::to_value(summary).ok(),
        }
    }
}

/// Lifecycle state of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted and dispatching
    Running,
    /// Every target attempted
    Completed,
    /// Reconciled after an unclean shutdown
    Interrupted,
}

impl JobState {
    /// Lowercase name stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Interrupted => "interrupted",
        }
    }

    /// Parse a stored name; unknown values decode as `Running`
    pub fn from_db(value: &str) -> Self {
        match value {
            "completed" => JobState::Completed,
            "interrupted" => JobState::Interrupted,
            _ => JobState::Running,
        }
    }
}

/// Status of one target inside a [`JobStatusView`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatusView {
    /// Target identifier
    pub target: String,
    /// Recorded status, null while the target is pending
    pub status: Option<TargetStatus>,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When a scheduled post goes out
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub retry_at: Option<DateTime<Utc>>,
}

impl TargetStatusView {
    /// View of a target, pending when no record exists
    pub fn new(target: impl Into<String>, record: Option<&StatusRecord>) -> Self {
        Self {
            target: target.into(),
            status: record.map(|r| r.status),
            error: record.and_then(|r| r.error.clone()),
            retry_at: record.and_then(|r| r.retry_at),
        }
    }
}

/// Everything known about a job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    /// Job id
    pub id: JobId,
    /// Lifecycle state
    pub state: JobState,
    /// Per-target status in dispatch order
    pub targets: Vec<TargetStatusView>,
    /// Final buckets once the job is over
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JobSummary>,
    /// Submission time
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    /// Completion time
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn progress_event_serializes_with_camel_case_and_type_tag() {
        let event = Event::Progress {
            job_id: JobId::from("job-1"),
            target: "tumblr".into(),
            status: TargetStatus::Scheduled,
            progress: 100,
            error: None,
            retry_at: Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "progress");
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["progress"], 100);
        assert_eq!(json["retryAt"], "2026-01-02T03:04:05Z");
        assert!(json.get("error").is_none());
        assert_eq!(event.name(), "progressUpdate");
    }

    #[test]
    fn summary_event_uses_successful_and_failed_keys() {
        let event = Event::Summary {
            job_id: JobId::from("job-1"),
            status: SummaryStatus::Completed,
            summary: JobSummary {
                successful_targets: vec!["a".into()],
                failed_targets: vec![FailedTarget {
                    target: "b".into(),
                    reason: "boom".into(),
                }],
            },
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "summary");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["summary"]["successful"][0], "a");
        assert_eq!(json["summary"]["failed"][0]["target"], "b");
        assert_eq!(json["summary"]["failed"][0]["reason"], "boom");
        assert_eq!(event.name(), "taskCompleted");
    }

    #[test]
    fn request_accepts_platform_aliases() {
        let request: JobRequest = serde_json::from_str(
            r#"{
                "platforms": ["tumblr", "x"],
                "text": "hello",
                "platformOptions": {"tumblr": {"blogName": "my-blog"}}
            }"#,
        )
        .unwrap();
        let job = Job::try_from(request).unwrap();

        assert_eq!(job.targets, vec!["tumblr", "x"]);
        assert_eq!(job.options_for("tumblr").str("blogName"), Some("my-blog"));
        assert_eq!(job.options_for("TUMBLR").str("blogName"), Some("my-blog"));
        assert!(job.options_for("x").0.is_empty());
    }

    #[test]
    fn request_uses_correlation_id_when_given() {
        let request: JobRequest =
            serde_json::from_str(r#"{"targets":["bluesky"],"correlationId":"abc-123"}"#).unwrap();
        let job = Job::try_from(request).unwrap();
        assert_eq!(job.id.as_str(), "abc-123");
    }

    #[test]
    fn blank_correlation_id_is_rejected() {
        let request: JobRequest =
            serde_json::from_str(r#"{"targets":["bluesky"],"correlationId":"  "}"#).unwrap();
        assert_eq!(
            Job::try_from(request).unwrap_err(),
            ValidationError::InvalidCorrelationId
        );
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(JobId::generate(), JobId::generate());
    }

    #[test]
    fn images_decode_with_affinity() {
        let request: JobRequest = serde_json::from_str(
            r#"{"targets":["x"],"images":[
                {"base64":"data:image/png;base64,aGVsbG8=","platforms":["x"]},
                {"base64":"aGVsbG8="}
            ]}"#,
        )
        .unwrap();
        let job = Job::try_from(request).unwrap();

        assert_eq!(job.images.len(), 2);
        assert_eq!(job.images[0].data.mime_type, "image/png");
        assert_eq!(job.images[0].data.bytes, b"hello");
        assert_eq!(job.images[0].affinity, vec!["x"]);
        assert_eq!(job.images[1].data.mime_type, "image/jpeg");
        assert!(job.images[1].affinity.is_empty());
    }

    #[test]
    fn invalid_image_reports_its_index() {
        let request: JobRequest = serde_json::from_str(
            r#"{"targets":["x"],"images":[{"base64":"data:image/png;base64,aGVsbG8="},{"base64":"%%%"}]}"#,
        )
        .unwrap();

        match Job::try_from(request).unwrap_err() {
            ValidationError::InvalidImage { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn direct_post_becomes_a_one_target_job() {
        let request: DirectPostRequest = serde_json::from_str(
            r#"{
                "blogName": "my-blog",
                "text": "hi",
                "tags": ["a"],
                "images": ["data:image/png;base64,aGVsbG8="],
                "options": {"state": "draft"}
            }"#,
        )
        .unwrap();
        let job = request.into_job("tumblr").unwrap();

        assert_eq!(job.targets, vec!["tumblr"]);
        assert_eq!(job.text.as_deref(), Some("hi"));
        assert_eq!(job.tags, vec!["a"]);
        assert_eq!(job.images.len(), 1);
        assert!(job.images[0].affinity.is_empty());
        let options = job.options_for("tumblr");
        assert_eq!(options.str("blogName"), Some("my-blog"));
        assert_eq!(options.str("state"), Some("draft"));
    }

    #[test]
    fn direct_post_with_bad_image_is_rejected() {
        let request = DirectPostRequest {
            images: vec!["data:image/png;base64,%%%".into()],
            ..DirectPostRequest::default()
        };
        assert!(matches!(
            request.into_job("bluesky").unwrap_err(),
            ValidationError::InvalidImage { index: 0, .. }
        ));
    }

    #[test]
    fn identical_bytes_share_a_digest() {
        let a = ImageData::new("image/png", b"same".to_vec());
        let b = ImageData::new("image/jpeg", b"same".to_vec());
        let c = ImageData::new("image/png", b"other".to_vec());

        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn status_record_from_results() {
        let failure = StatusRecord::from_result(&TargetResult::failure("nope", false));
        assert_eq!(failure.status, TargetStatus::Error);
        assert_eq!(failure.error.as_deref(), Some("nope"));

        let retry_at = Utc::now();
        let scheduled = StatusRecord::from_result(&TargetResult::Scheduled {
            retry_at,
            data: serde_json::Value::Null,
        });
        assert_eq!(scheduled.status, TargetStatus::Scheduled);
        assert_eq!(scheduled.retry_at, Some(retry_at));
        assert!(scheduled.data.is_none());
    }

    #[test]
    fn summary_record_is_error_when_any_target_failed() {
        let summary = JobSummary {
            successful_targets: vec!["a".into()],
            failed_targets: vec![FailedTarget {
                target: "b".into(),
                reason: "x".into(),
            }],
        };
        let record = StatusRecord::from_summary(&summary);
        assert_eq!(record.status, TargetStatus::Error);
        assert_eq!(record.error.as_deref(), Some("b"));
        assert_eq!(record.data.unwrap()["successful"][0], "a");

        let clean = StatusRecord::from_summary(&JobSummary {
            successful_targets: vec!["a".into()],
            failed_targets: vec![],
        });
        assert_eq!(clean.status, TargetStatus::Success);
        assert!(clean.error.is_none());
    }

    #[test]
    fn status_names_round_trip_through_db_strings() {
        for status in [
            TargetStatus::Success,
            TargetStatus::Error,
            TargetStatus::Scheduled,
        ] {
            assert_eq!(TargetStatus::from_db(status.as_str()), status);
        }
        for state in [JobState::Running, JobState::Completed, JobState::Interrupted] {
            assert_eq!(JobState::from_db(state.as_str()), state);
        }
    }
}
