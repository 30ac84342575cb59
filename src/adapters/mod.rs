//! Platform adapters
//!
//! Every platform sits behind [`TargetAdapter`]. The orchestrator only knows
//! the trait: it asks an adapter for its [`AdapterCapabilities`], lets it
//! validate its options, then hands it the routed [`PublishContent`].
//!
//! Adapters never return errors to the orchestrator. Anything that goes wrong
//! is folded into [`TargetResult::Failure`], with `retriable` taken from
//! [`IsRetryable`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::content::PublishContent;
use crate::error::{Error, ValidationError};
use crate::retry::IsRetryable;
use crate::types::{TargetOptions, TargetResult};

mod bluesky;
mod registry;
pub mod tags;
mod threads;
mod tumblr;
mod twitter;

pub use bluesky::BlueskyAdapter;
pub use registry::AdapterRegistry;
pub use threads::ThreadsAdapter;
pub use tumblr::TumblrAdapter;
pub use twitter::TwitterAdapter;

/// Platforms this crate ships adapters for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Tumblr
    Tumblr,
    /// Twitter, also accepted as `x`
    Twitter,
    /// Bluesky
    Bluesky,
    /// Threads
    Threads,
}

impl TargetKind {
    /// Every known platform
    pub const ALL: [TargetKind; 4] = [
        TargetKind::Tumblr,
        TargetKind::Twitter,
        TargetKind::Bluesky,
        TargetKind::Threads,
    ];

    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Tumblr => "tumblr",
            TargetKind::Twitter => "twitter",
            TargetKind::Bluesky => "bluesky",
            TargetKind::Threads => "threads",
        }
    }

    /// Resolve an identifier or alias, case-insensitively
    pub fn parse(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "tumblr" => Some(TargetKind::Tumblr),
            "twitter" | "x" => Some(TargetKind::Twitter),
            "bluesky" => Some(TargetKind::Bluesky),
            "threads" => Some(TargetKind::Threads),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form of a target identifier
///
/// Lowercased and trimmed, with platform aliases folded (`X` and `twitter`
/// compare equal). Identifiers that are not known platforms keep their
/// lowercased form.
pub fn canonical_id(id: &str) -> String {
    match TargetKind::parse(id) {
        Some(kind) => kind.as_str().to_string(),
        None => id.trim().to_ascii_lowercase(),
    }
}

/// How an adapter wants to receive images
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageDelivery {
    /// Decoded bytes, uploaded by the adapter itself
    RawBytes,
    /// Publicly reachable URLs produced by the image host
    HostedUrl,
}

/// What an adapter can accept
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdapterCapabilities {
    /// Image transport
    pub image_delivery: ImageDelivery,
    /// Images per post; extra routed images are dropped (None = unlimited)
    pub max_images: Option<usize>,
}

impl AdapterCapabilities {
    /// Raw bytes with an optional limit
    pub fn raw_bytes(max_images: Option<usize>) -> Self {
        Self {
            image_delivery: ImageDelivery::RawBytes,
            max_images,
        }
    }

    /// Hosted URLs with an optional limit
    pub fn hosted_url(max_images: Option<usize>) -> Self {
        Self {
            image_delivery: ImageDelivery::HostedUrl,
            max_images,
        }
    }
}

/// A destination platform
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use publish_all::adapters::{AdapterCapabilities, TargetAdapter};
/// use publish_all::content::PublishContent;
/// use publish_all::types::{TargetOptions, TargetResult};
///
/// struct Stdout;
///
/// #[async_trait]
/// impl TargetAdapter for Stdout {
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     fn capabilities(&self) -> AdapterCapabilities {
///         AdapterCapabilities::raw_bytes(None)
///     }
///
///     async fn publish(&self, content: &PublishContent, _: &TargetOptions) -> TargetResult {
///         println!("{}", content.text());
///         TargetResult::success()
///     }
/// }
/// ```
#[async_trait]
pub trait TargetAdapter: Send + Sync {
    /// Target identifier used in logs and validation errors
    fn name(&self) -> &str;

    /// Image transport and limits
    fn capabilities(&self) -> AdapterCapabilities;

    /// Check the job's options for this target before anything is dispatched
    fn validate_options(&self, _options: &TargetOptions) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Publish the content; failures are returned as [`TargetResult::Failure`]
    async fn publish(&self, content: &PublishContent, options: &TargetOptions) -> TargetResult;
}

/// Fold an error into a failure result
pub(crate) fn failure_from_error(error: &Error) -> TargetResult {
    TargetResult::failure(error.to_string(), error.is_retryable())
}

/// Shared "text or images" check
pub(crate) fn require_text_or_images(content: &PublishContent) -> Option<TargetResult> {
    if content.has_text() || !content.images.is_empty() {
        None
    } else {
        Some(TargetResult::failure("text or images are required", false))
    }
}

/// Turn a non-success HTTP response into [`Error::Platform`]
///
/// Pulls a human-readable message out of the usual JSON error shapes and
/// falls back to the raw body.
pub(crate) async fn platform_error(target: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| error_message(&json))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                trimmed.chars().take(300).collect()
            }
        });
    Error::platform(target, Some(status.as_u16()), message)
}

fn error_message(json: &serde_json::Value) -> Option<String> {
    let candidates = [
        json.pointer("/error/message"),
        json.pointer("/errors/0/detail"),
        json.pointer("/errors/0/message"),
        json.pointer("/meta/msg"),
        json.get("detail"),
        json.get("message"),
        json.get("error"),
        json.get("title"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_fold_to_canonical_ids() {
        assert_eq!(canonical_id("X"), "twitter");
        assert_eq!(canonical_id(" twitter "), "twitter");
        assert_eq!(canonical_id("Bluesky"), "bluesky");
        assert_eq!(canonical_id("MySpace"), "myspace");
    }

    #[test]
    fn target_kind_parse_and_display_agree() {
        for kind in TargetKind::ALL {
            assert_eq!(TargetKind::parse(kind.as_str()), Some(kind));
            assert_eq!(kind.to_string(), kind.as_str());
        }
        assert_eq!(TargetKind::parse("x"), Some(TargetKind::Twitter));
        assert_eq!(TargetKind::parse("mastodon"), None);
    }

    #[test]
    fn error_message_prefers_structured_fields() {
        let json = serde_json::json!({"error": {"message": "Invalid token", "code": 190}});
        assert_eq!(error_message(&json).as_deref(), Some("Invalid token"));

        let json = serde_json::json!({"errors": [{"detail": "duplicate content"}]});
        assert_eq!(error_message(&json).as_deref(), Some("duplicate content"));

        let json = serde_json::json!({"error": "AuthenticationRequired", "message": "Invalid identifier or password"});
        assert_eq!(
            error_message(&json).as_deref(),
            Some("Invalid identifier or password")
        );

        assert_eq!(error_message(&serde_json::json!({"ok": true})), None);
    }

    #[test]
    fn failure_from_error_keeps_retry_classification() {
        let retriable = failure_from_error(&Error::platform("x", Some(503), "down"));
        assert_eq!(retriable, TargetResult::failure("x error: down", true));

        let permanent = failure_from_error(&Error::platform("x", Some(401), "bad token"));
        assert_eq!(
            permanent,
            TargetResult::failure("x error: bad token", false)
        );
    }
}
