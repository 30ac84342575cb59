//! Threads adapter (Graph API containers)

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Value, json};

use super::tags::topic_tag;
use super::{AdapterCapabilities, TargetAdapter, failure_from_error, platform_error, require_text_or_images};
use crate::config::ThreadsConfig;
use crate::content::PublishContent;
use crate::error::{Error, Result};
use crate::types::{TargetOptions, TargetResult};

const NAME: &str = "threads";

/// Carousel size limit
const MAX_CAROUSEL_ITEMS: usize = 20;

/// Posts to Threads from hosted image URLs
///
/// A post is a media container (TEXT, IMAGE, or CAROUSEL of IMAGE items)
/// that is then published. The first tag becomes the topic tag.
pub struct ThreadsAdapter {
    client: reqwest::Client,
    config: ThreadsConfig,
}

impl ThreadsAdapter {
    /// Create an adapter from credentials
    pub fn new(client: reqwest::Client, config: ThreadsConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, edge: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.user_id,
            edge
        )
    }

    /// POST form fields to an edge and return the `id` of the response
    async fn call(&self, edge: &str, mut fields: Vec<(&str, String)>) -> Result<String> {
        fields.push(("access_token", self.config.access_token.clone()));
        let response = self.client.post(self.url(edge)).form(&fields).send().await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::platform(NAME, None, format!("unexpected response: {}", e)))?;
        if let Some(message) = body.pointer("/error/message").and_then(Value::as_str) {
            return Err(Error::platform(NAME, None, message));
        }
        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::platform(NAME, None, "response has no id"))
    }

    async fn create_container(&self, content: &PublishContent, urls: &[&str]) -> Result<String> {
        let text = content.text().replace('\t', "");
        let mut fields: Vec<(&str, String)> = Vec::new();
        if !text.trim().is_empty() {
            fields.push(("text", text));
        }
        if let Some(topic) = topic_tag(&content.tags) {
            fields.push(("topic_tag", topic));
        }

        match urls {
            [] => {
                fields.push(("media_type", "TEXT".to_string()));
            }
            [url] => {
                fields.push(("media_type", "IMAGE".to_string()));
                fields.push(("image_url", url.to_string()));
            }
            many => {
                let children = try_join_all(many.iter().map(|url| {
                    self.call(
                        "threads",
                        vec![
                            ("media_type", "IMAGE".to_string()),
                            ("image_url", url.to_string()),
                            ("is_carousel_item", "true".to_string()),
                        ],
                    )
                }))
                .await?;
                tracing::debug!(items = children.len(), "Threads carousel items created");
                fields.push(("media_type", "CAROUSEL".to_string()));
                fields.push(("children", children.join(",")));
            }
        }

        self.call("threads", fields).await
    }

    async fn post(&self, content: &PublishContent) -> Result<TargetResult> {
        let urls = content
            .images
            .iter()
            .map(|image| {
                image.hosted_url.as_deref().ok_or_else(|| {
                    Error::ImageUpload(format!("image {} has no hosted URL", image.index))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let creation_id = self.create_container(content, &urls).await?;
        let post_id = self
            .call("threads_publish", vec![("creation_id", creation_id)])
            .await?;
        tracing::debug!(post_id = %post_id, "Threads post published");

        Ok(TargetResult::Success {
            data: json!({ "postId": post_id }),
        })
    }
}

#[async_trait]
impl TargetAdapter for ThreadsAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::hosted_url(Some(MAX_CAROUSEL_ITEMS))
    }

    async fn publish(&self, content: &PublishContent, _options: &TargetOptions) -> TargetResult {
        if let Some(rejected) = require_text_or_images(content) {
            return rejected;
        }

        match self.post(content).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Threads post failed");
                failure_from_error(&e)
            }
        }
    }
}
