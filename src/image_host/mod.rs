//! Image hosting
//!
//! Some platforms only accept images by public URL. [`ImageHost`] uploads a
//! decoded image and returns where it can be fetched from.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;
use crate::error::{Error, Result};
use crate::types::ImageData;

/// Uploads images and returns public URLs
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Name for logs
    fn name(&self) -> &str;

    /// Upload one image
    async fn upload(&self, image: &ImageData) -> Result<String>;
}

/// Signed uploads to Cloudinary
pub struct CloudinaryImageHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryImageHost {
    /// Create a host from credentials
    pub fn new(client: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }
}

/// Hex SHA-256 over the alphabetically sorted `key=value` pairs followed by the secret
pub(crate) fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, image: &ImageData) -> Result<String> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("folder", self.config.folder.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );
        let file = image.to_data_url();

        let response = self
            .client
            .post(self.upload_url())
            .form(&[
                ("file", file.as_str()),
                ("folder", self.config.folder.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(crate::adapters::platform_error("cloudinary", response).await);
        }

        let body: UploadResponse = response.json().await.map_err(|e| {
            Error::ImageUpload(format!("unexpected cloudinary response: {}", e))
        })?;
        tracing::debug!(url = %body.secure_url, bytes = image.bytes.len(), "Image hosted");
        Ok(body.secure_url)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key-123".into(),
            api_secret: "shh".into(),
            folder: "api-post-uploads".into(),
            base_url,
        }
    }

    #[test]
    fn signature_is_order_independent_and_secret_dependent() {
        let a = sign(&[("timestamp", "1"), ("folder", "f")], "secret");
        let b = sign(&[("folder", "f"), ("timestamp", "1")], "secret");
        let c = sign(&[("folder", "f"), ("timestamp", "1")], "other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn signature_matches_known_digest() {
        // sha256("folder=f&timestamp=1secret")
        let expected: String = Sha256::digest(b"folder=f&timestamp=1secret")
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        assert_eq!(sign(&[("folder", "f"), ("timestamp", "1")], "secret"), expected);
    }

    #[tokio::test]
    async fn upload_posts_signed_form_and_returns_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .and(body_string_contains("api_key=key-123"))
            .and(body_string_contains("folder=api-post-uploads"))
            .and(body_string_contains("signature_algorithm=sha256"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/a.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let host = CloudinaryImageHost::new(reqwest::Client::new(), config(server.uri()));
        let url = host
            .upload(&ImageData::new("image/png", b"png".to_vec()))
            .await
            .unwrap();

        assert_eq!(url, "https://res.cloudinary.com/demo/image/upload/v1/a.png");
    }

    #[tokio::test]
    async fn rejected_upload_surfaces_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Invalid Signature"}
            })))
            .mount(&server)
            .await;

        let host = CloudinaryImageHost::new(reqwest::Client::new(), config(server.uri()));
        let err = host
            .upload(&ImageData::new("image/png", b"png".to_vec()))
            .await
            .unwrap_err();

        match err {
            Error::Platform {
                status, message, ..
            } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
