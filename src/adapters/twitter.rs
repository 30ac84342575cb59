//! Twitter / X adapter (API v2)

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::tags::append_hashtags;
use super::{AdapterCapabilities, TargetAdapter, failure_from_error, platform_error};
use crate::config::TwitterConfig;
use crate::content::{ContentImage, PublishContent};
use crate::error::{Error, Result};
use crate::types::{TargetOptions, TargetResult};

const NAME: &str = "twitter";

/// Posts tweets with up to four images
///
/// Every publish starts by exchanging the refresh token for a fresh access
/// token. X rotates the refresh token on each exchange; the latest one is
/// kept here for the next call.
pub struct TwitterAdapter {
    client: reqwest::Client,
    config: TwitterConfig,
    refresh_token: Mutex<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct MediaId {
    id: String,
}

impl TwitterAdapter {
    /// Create an adapter from credentials
    pub fn new(client: reqwest::Client, config: TwitterConfig) -> Self {
        let refresh_token = Mutex::new(config.refresh_token.clone());
        Self {
            client,
            config,
            refresh_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// OAuth2 refresh-token grant; holds the lock so exchanges never race
    async fn access_token(&self) -> Result<String> {
        let mut refresh_token = self.refresh_token.lock().await;
        let response = self
            .client
            .post(self.url("/2/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::platform(NAME, None, format!("unexpected token response: {}", e)))?;
        if let Some(rotated) = tokens.refresh_token {
            *refresh_token = rotated;
        }
        tracing::debug!("Twitter access token refreshed");
        Ok(tokens.access_token)
    }

    async fn upload_media(&self, image: &ContentImage, token: &str) -> Result<String> {
        let part = Part::bytes(image.data.bytes.clone())
            .file_name(format!("image.{}", image.data.extension()))
            .mime_str(&image.data.mime_type)?;
        let form = Form::new()
            .part("media", part)
            .text("media_category", "tweet_image")
            .text("media_type", image.data.mime_type.clone());

        let response = self
            .client
            .post(self.url("/2/media/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }

        let media: DataEnvelope<MediaId> = response
            .json()
            .await
            .map_err(|e| Error::platform(NAME, None, format!("unexpected media response: {}", e)))?;
        Ok(media.data.id)
    }

    async fn tweet(&self, content: &PublishContent) -> Result<TargetResult> {
        let token = self.access_token().await?;

        let mut media_ids = Vec::with_capacity(content.images.len());
        for image in &content.images {
            media_ids.push(self.upload_media(image, &token).await?);
        }
        tracing::debug!(media = media_ids.len(), "Twitter media uploaded");

        let mut body = json!({ "text": append_hashtags(content.text(), &content.tags) });
        if !media_ids.is_empty() {
            body["media"] = json!({ "media_ids": media_ids });
        }

        let response = self
            .client
            .post(self.url("/2/tweets"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }

        let data = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|mut v| v.get_mut("data").map(Value::take))
            .unwrap_or(Value::Null);
        Ok(TargetResult::Success { data })
    }
}

#[async_trait]
impl TargetAdapter for TwitterAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::raw_bytes(Some(4))
    }

    async fn publish(&self, content: &PublishContent, _options: &TargetOptions) -> TargetResult {
        if !content.has_text() {
            return TargetResult::failure("text is required for twitter", false);
        }

        match self.tweet(content).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Tweet failed");
                failure_from_error(&e)
            }
        }
    }
}
