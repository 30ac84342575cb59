//! Bluesky adapter (AT Protocol XRPC)

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use super::tags::append_hashtags;
use super::{AdapterCapabilities, TargetAdapter, failure_from_error, platform_error, require_text_or_images};
use crate::config::BlueskyConfig;
use crate::content::PublishContent;
use crate::error::{Error, Result};
use crate::types::{TargetOptions, TargetResult};

const NAME: &str = "bluesky";

#[allow(clippy::expect_used)]
static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(#[^\s#]+)").expect("hashtag pattern is valid"));

#[allow(clippy::expect_used)]
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("link pattern is valid"));

/// Posts to Bluesky with up to four images
///
/// A session is created for every publish, so the adapter holds no tokens
/// between jobs.
pub struct BlueskyAdapter {
    client: reqwest::Client,
    config: BlueskyConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    blob: Value,
}

impl BlueskyAdapter {
    /// Create an adapter from credentials
    pub fn new(client: reqwest::Client, config: BlueskyConfig) -> Self {
        Self { client, config }
    }

    fn xrpc(&self, method: &str) -> String {
        format!(
            "{}/xrpc/{}",
            self.config.service_url.trim_end_matches('/'),
            method
        )
    }

    async fn create_session(&self) -> Result<Session> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&json!({
                "identifier": self.config.handle,
                "password": self.config.app_password,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| Error::platform(NAME, None, format!("unexpected session response: {}", e)))
    }

    async fn upload_blob(&self, session: &Session, mime_type: &str, bytes: Vec<u8>) -> Result<Value> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }
        let blob: BlobResponse = response
            .json()
            .await
            .map_err(|e| Error::platform(NAME, None, format!("unexpected blob response: {}", e)))?;
        Ok(blob.blob)
    }

    async fn post(&self, content: &PublishContent) -> Result<TargetResult> {
        let session = self.create_session().await?;

        let mut embeds = Vec::with_capacity(content.images.len());
        for image in &content.images {
            let blob = self
                .upload_blob(&session, &image.data.mime_type, image.data.bytes.clone())
                .await?;
            embeds.push(json!({ "image": blob, "alt": "" }));
        }

        let text = append_hashtags(content.text(), &content.tags);
        let mut record = json!({
            "$type": "app.bsky.feed.post",
            "text": text,
            "createdAt": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        });
        let facets = detect_facets(&text);
        if !facets.is_empty() {
            record["facets"] = Value::Array(facets);
        }
        if !embeds.is_empty() {
            record["embed"] = json!({ "$type": "app.bsky.embed.images", "images": embeds });
        }

        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }

        let data = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok(TargetResult::Success { data })
    }
}

/// Hashtag and link facets with UTF-8 byte offsets
pub(crate) fn detect_facets(text: &str) -> Vec<Value> {
    let mut facets = Vec::new();

    for captures in HASHTAG.captures_iter(text) {
        let Some(tag) = captures.get(1) else {
            continue;
        };
        let trimmed = tag
            .as_str()
            .trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '_');
        if trimmed.len() <= 1 {
            continue;
        }
        let start = tag.start();
        facets.push(json!({
            "index": { "byteStart": start, "byteEnd": start + trimmed.len() },
            "features": [{ "$type": "app.bsky.richtext.facet#tag", "tag": &trimmed[1..] }],
        }));
    }

    for link in LINK.find_iter(text) {
        let uri = link
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        let start = link.start();
        facets.push(json!({
            "index": { "byteStart": start, "byteEnd": start + uri.len() },
            "features": [{ "$type": "app.bsky.richtext.facet#link", "uri": uri }],
        }));
    }

    facets.sort_by_key(|f| f["index"]["byteStart"].as_u64());
    facets
}

#[async_trait]
impl TargetAdapter for BlueskyAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::raw_bytes(Some(4))
    }

    async fn publish(&self, content: &PublishContent, _options: &TargetOptions) -> TargetResult {
        if let Some(rejected) = require_text_or_images(content) {
            return rejected;
        }

        match self.post(content).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(handle = %self.config.handle, error = %e, "Bluesky post failed");
                failure_from_error(&e)
            }
        }
    }
}
