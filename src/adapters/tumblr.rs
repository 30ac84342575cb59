//! Tumblr adapter (NPF posts)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AdapterCapabilities, TargetAdapter, failure_from_error, platform_error, require_text_or_images};
use crate::config::TumblrConfig;
use crate::content::PublishContent;
use crate::error::{Error, Result, ValidationError};
use crate::types::{TargetOptions, TargetResult};

const NAME: &str = "tumblr";

/// Option naming the destination blog
pub const BLOG_NAME_OPTION: &str = "blogName";

/// Posts to a Tumblr blog
///
/// When Tumblr refuses a post with 403 (daily post limit), the post is sent
/// again into the blog's queue, to go out after the configured
/// `reschedule_delay`, and the target reports [`TargetResult::Scheduled`].
pub struct TumblrAdapter {
    client: reqwest::Client,
    config: TumblrConfig,
}

/// Publish immediately or queue for later
#[derive(Clone, Copy)]
enum PostState {
    Published,
    Queued(DateTime<Utc>),
}

impl TumblrAdapter {
    /// Create an adapter from credentials
    pub fn new(client: reqwest::Client, config: TumblrConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.config.base_url).map_err(|e| Error::Config {
            message: format!("invalid tumblr base_url: {}", e),
            key: Some("targets.tumblr.base_url".to_string()),
        })?;
        url.path_segments_mut()
            .map_err(|_| Error::Config {
                message: "tumblr base_url cannot be a base".to_string(),
                key: Some("targets.tumblr.base_url".to_string()),
            })?
            .pop_if_empty()
            .push("v2")
            .extend(segments);
        Ok(url)
    }

    /// Names of the blogs the token's user can post to
    pub async fn blog_names(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint(&["user", "info"])?)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }

        let info: UserInfo = response.json().await?;
        Ok(info.response.user.blogs.into_iter().map(|b| b.name).collect())
    }

    /// NPF body: a text block, one image block per image, comma-joined tags
    fn post_body(content: &PublishContent, state: PostState) -> Value {
        let mut blocks = Vec::new();
        if content.has_text() {
            blocks.push(json!({ "type": "text", "text": content.text() }));
        }
        for (i, image) in content.images.iter().enumerate() {
            blocks.push(json!({
                "type": "image",
                "media": [{ "type": image.data.mime_type, "identifier": format!("image{}", i) }],
            }));
        }

        let tags = content
            .tags
            .iter()
            .map(|t| t.trim().trim_start_matches('#').trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        let mut body = json!({ "content": blocks });
        if !tags.is_empty() {
            body["tags"] = Value::String(tags);
        }
        if let PostState::Queued(at) = state {
            body["state"] = json!("queue");
            body["publish_on"] = json!(at.to_rfc3339());
        }
        body
    }

    async fn send(
        &self,
        blog: &str,
        content: &PublishContent,
        state: PostState,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(&["blog", blog, "posts"])?;
        let body = Self::post_body(content, state);
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token);

        let request = if content.images.is_empty() {
            request.json(&body)
        } else {
            let mut form = Form::new().part(
                "json",
                Part::text(body.to_string()).mime_str("application/json")?,
            );
            for (i, image) in content.images.iter().enumerate() {
                let part = Part::bytes(image.data.bytes.clone())
                    .file_name(format!("image{}.{}", i, image.data.extension()))
                    .mime_str(&image.data.mime_type)?;
                form = form.part(format!("image{}", i), part);
            }
            request.multipart(form)
        };

        Ok(request.send().await?)
    }

    async fn post(&self, content: &PublishContent, blog: &str) -> Result<TargetResult> {
        let response = self.send(blog, content, PostState::Published).await?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            let retry_at = Utc::now()
                + chrono::Duration::from_std(self.config.reschedule_delay)
                    .unwrap_or_else(|_| chrono::Duration::hours(24));
            tracing::warn!(
                blog,
                retry_at = %retry_at,
                "Tumblr refused the post, queueing it instead"
            );

            let queued = self
                .send(blog, content, PostState::Queued(retry_at))
                .await?;
            if !queued.status().is_success() {
                return Err(platform_error(NAME, queued).await);
            }
            let data = response_data(queued).await;
            return Ok(TargetResult::Scheduled { retry_at, data });
        }

        if !response.status().is_success() {
            return Err(platform_error(NAME, response).await);
        }
        Ok(TargetResult::Success {
            data: response_data(response).await,
        })
    }
}

#[derive(Deserialize)]
struct UserInfo {
    response: UserInfoResponse,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    user: TumblrUser,
}

#[derive(Deserialize)]
struct TumblrUser {
    #[serde(default)]
    blogs: Vec<TumblrBlog>,
}

#[derive(Deserialize)]
struct TumblrBlog {
    name: String,
}

async fn response_data(response: reqwest::Response) -> Value {
    response
        .json::<Value>()
        .await
        .ok()
        .and_then(|mut v| v.get_mut("response").map(Value::take))
        .unwrap_or(Value::Null)
}

#[async_trait]
impl TargetAdapter for TumblrAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::raw_bytes(None)
    }

    fn validate_options(&self, options: &TargetOptions) -> std::result::Result<(), ValidationError> {
        match options.str(BLOG_NAME_OPTION) {
            Some(_) => Ok(()),
            None => Err(ValidationError::MissingTargetOption {
                target: NAME.to_string(),
                option: BLOG_NAME_OPTION.to_string(),
            }),
        }
    }

    async fn publish(&self, content: &PublishContent, options: &TargetOptions) -> TargetResult {
        if let Some(rejected) = require_text_or_images(content) {
            return rejected;
        }
        let Some(blog) = options.str(BLOG_NAME_OPTION) else {
            return TargetResult::failure("blogName is required for tumblr", false);
        };

        match self.post(content, blog).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(blog, error = %e, "Tumblr post failed");
                failure_from_error(&e)
            }
        }
    }
}
