//! Configuration types for publish-all

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for [`Publisher`](crate::Publisher)
///
/// Fields are organized into sub-configs:
/// - [`publish`](PublishConfig) - dispatch pacing, timeouts, shutdown
/// - [`persistence`](PersistenceConfig) - status database location
/// - [`image_host`](ImageHostConfig) - hosted image uploads
/// - [`targets`](TargetsConfig) - per-platform credentials
/// - [`notifications`](NotificationConfig) - webhooks
/// - [`api`](ApiConfig) - REST server
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Job dispatch behaviour
    #[serde(default)]
    pub publish: PublishConfig,

    /// Status store settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Image hosting for targets that need public URLs
    #[serde(default)]
    pub image_host: ImageHostConfig,

    /// Platform credentials; a target without credentials is unavailable
    #[serde(default)]
    pub targets: TargetsConfig,

    /// Notification settings (webhooks)
    #[serde(flatten)]
    pub notifications: NotificationConfig,

    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load a configuration file (JSON)
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Fill credentials that the file left unset from the process environment
    pub fn with_env_credentials(self) -> Self {
        self.with_credentials_from(|key| std::env::var(key).ok())
    }

    /// Fill unset credentials from an arbitrary key lookup
    pub fn with_credentials_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let from_env = TargetsConfig::from_lookup(&lookup);
        self.targets.tumblr = self.targets.tumblr.or(from_env.tumblr);
        self.targets.twitter = self.targets.twitter.or(from_env.twitter);
        self.targets.bluesky = self.targets.bluesky.or(from_env.bluesky);
        self.targets.threads = self.targets.threads.or(from_env.threads);

        if self.image_host.cloudinary.is_none() {
            self.image_host.cloudinary = CloudinaryConfig::from_lookup(&lookup);
        }
        if self.api.api_key.is_none() {
            self.api.api_key = non_empty(&lookup, "PUBLISH_ALL_API_KEY");
        }
        self
    }
}

/// Job dispatch behaviour
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishConfig {
    /// Pause after a successful or scheduled target when more targets remain (default: 3 seconds)
    #[serde(default = "default_inter_target_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub inter_target_delay: Duration,

    /// Upper bound on a single adapter call (default: 120 seconds)
    #[serde(default = "default_target_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub target_timeout: Duration,

    /// Capacity of the live event channel (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// How long shutdown waits for in-flight jobs (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub shutdown_timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            inter_target_delay: default_inter_target_delay(),
            target_timeout: default_target_timeout(),
            event_buffer: default_event_buffer(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./publish-all.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Image hosting configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ImageHostConfig {
    /// Cloudinary account; without it, targets needing hosted URLs cannot receive images
    #[serde(default)]
    pub cloudinary: Option<CloudinaryConfig>,

    /// Retry policy for each upload
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Cloudinary signed-upload credentials
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CloudinaryConfig {
    /// Cloud name
    pub cloud_name: String,

    /// API key
    pub api_key: String,

    /// API secret used to sign uploads
    pub api_secret: String,

    /// Destination folder (default: "api-post-uploads")
    #[serde(default = "default_cloudinary_folder")]
    pub folder: String,

    /// API root (default: "https://api.cloudinary.com/v1_1")
    #[serde(default = "default_cloudinary_base_url")]
    pub base_url: String,
}

impl CloudinaryConfig {
    /// Read `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY` and `CLOUDINARY_API_SECRET`
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        Some(Self {
            cloud_name: non_empty(&lookup, "CLOUDINARY_CLOUD_NAME")?,
            api_key: non_empty(&lookup, "CLOUDINARY_API_KEY")?,
            api_secret: non_empty(&lookup, "CLOUDINARY_API_SECRET")?,
            folder: default_cloudinary_folder(),
            base_url: default_cloudinary_base_url(),
        })
    }
}

/// Per-platform credentials
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TargetsConfig {
    /// Tumblr credentials
    #[serde(default)]
    pub tumblr: Option<TumblrConfig>,

    /// Twitter / X credentials
    #[serde(default)]
    pub twitter: Option<TwitterConfig>,

    /// Bluesky credentials
    #[serde(default)]
    pub bluesky: Option<BlueskyConfig>,

    /// Threads credentials
    #[serde(default)]
    pub threads: Option<ThreadsConfig>,
}

impl TargetsConfig {
    /// Read platform credentials from environment variables
    ///
    /// A platform is configured only when all of its variables are set:
    /// `TUMBLR_ACCESS_TOKEN`,
    /// `TWITTER_CLIENT_ID` + `TWITTER_CLIENT_SECRET` + `TWITTER_REFRESH_TOKEN`,
    /// `BLUESKY_HANDLE` + `BLUESKY_APP_PASSWORD`,
    /// `THREADS_ACCESS_TOKEN` + `THREADS_USER_ID`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let tumblr = non_empty(&lookup, "TUMBLR_ACCESS_TOKEN").map(|access_token| TumblrConfig {
            access_token,
            base_url: default_tumblr_base_url(),
            reschedule_delay: default_reschedule_delay(),
        });
        let twitter = match (
            non_empty(&lookup, "TWITTER_CLIENT_ID"),
            non_empty(&lookup, "TWITTER_CLIENT_SECRET"),
            non_empty(&lookup, "TWITTER_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => Some(TwitterConfig {
                client_id,
                client_secret,
                refresh_token,
                base_url: default_twitter_base_url(),
            }),
            _ => None,
        };
        let bluesky = match (
            non_empty(&lookup, "BLUESKY_HANDLE"),
            non_empty(&lookup, "BLUESKY_APP_PASSWORD"),
        ) {
            (Some(handle), Some(app_password)) => Some(BlueskyConfig {
                handle,
                app_password,
                service_url: default_bluesky_service_url(),
            }),
            _ => None,
        };
        let threads = match (
            non_empty(&lookup, "THREADS_ACCESS_TOKEN"),
            non_empty(&lookup, "THREADS_USER_ID"),
        ) {
            (Some(access_token), Some(user_id)) => Some(ThreadsConfig {
                access_token,
                user_id,
                base_url: default_threads_base_url(),
            }),
            _ => None,
        };

        Self {
            tumblr,
            twitter,
            bluesky,
            threads,
        }
    }
}

/// Tumblr credentials
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TumblrConfig {
    /// OAuth2 access token
    pub access_token: String,

    /// API root (default: "https://api.tumblr.com")
    #[serde(default = "default_tumblr_base_url")]
    pub base_url: String,

    /// How far ahead a rejected post is queued (default: 24 hours)
    #[serde(default = "default_reschedule_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub reschedule_delay: Duration,
}

/// Twitter / X credentials
///
/// Access tokens are short-lived, so the adapter exchanges the refresh token
/// for a new one on every publish. Scopes needed: `tweet.write`,
/// `media.write` and `offline.access`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TwitterConfig {
    /// OAuth2 client id
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// Refresh token from the initial authorization
    pub refresh_token: String,

    /// API root (default: "https://api.x.com")
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,
}

/// Bluesky credentials
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BlueskyConfig {
    /// Account handle (e.g. "alice.bsky.social")
    pub handle: String,

    /// App password
    pub app_password: String,

    /// PDS root (default: "https://bsky.social")
    #[serde(default = "default_bluesky_service_url")]
    pub service_url: String,
}

/// Threads credentials
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadsConfig {
    /// Long-lived access token
    pub access_token: String,

    /// Threads user id that owns the token
    pub user_id: String,

    /// Graph API root (default: "https://graph.threads.net/v1.0")
    #[serde(default = "default_threads_base_url")]
    pub base_url: String,
}

/// Notification configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NotificationConfig {
    /// Webhook configurations
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

/// Webhook configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookConfig {
    /// URL to POST to
    pub url: String,

    /// Events that trigger this webhook
    pub events: Vec<WebhookEvent>,

    /// Optional authentication header value
    #[serde(default)]
    pub auth_header: Option<String>,

    /// Timeout for webhook requests (default: 30 seconds)
    #[serde(default = "default_webhook_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,
}

/// Webhook trigger event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum WebhookEvent {
    /// Every per-target progress event
    OnProgress,
    /// Only progress events for failed targets
    OnTargetFailed,
    /// The final summary of a job
    OnCompleted,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Largest accepted request body in bytes (default: 50 MiB)
    ///
    /// Images arrive inline as base64 data URLs, so this bounds the size of a job.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn non_empty(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_inter_target_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_target_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_event_buffer() -> usize {
    1000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./publish-all.db")
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_cloudinary_folder() -> String {
    "api-post-uploads".to_string()
}

fn default_cloudinary_base_url() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_tumblr_base_url() -> String {
    "https://api.tumblr.com".to_string()
}

fn default_reschedule_delay() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_twitter_base_url() -> String {
    "https://api.x.com".to_string()
}

fn default_bluesky_service_url() -> String {
    "https://bsky.social".to_string()
}

fn default_threads_base_url() -> String {
    "https://graph.threads.net/v1.0".to_string()
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
