//! Image preparation for targets that need hosted URLs

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::try_join_all;

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::image_host::ImageHost;
use crate::retry::with_retry;
use crate::types::{ImageAttachment, ImageData};

/// Hosted URL per image index
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreparedImages {
    urls: HashMap<usize, String>,
}

impl PreparedImages {
    /// Build from `(index, url)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        Self {
            urls: pairs.into_iter().map(|(i, url)| (i, url.into())).collect(),
        }
    }

    /// URL for the image at `index`
    pub fn url(&self, index: usize) -> Option<&str> {
        self.urls.get(&index).map(String::as_str)
    }

    /// Number of images with a URL
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether no image has a URL
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Uploads each distinct image once per job
///
/// Byte-identical images (same SHA-256) share one upload. Uploads run
/// concurrently and the batch succeeds only if every upload does.
#[derive(Clone)]
pub struct ImagePreparer {
    host: Option<Arc<dyn ImageHost>>,
    retry: RetryConfig,
}

impl ImagePreparer {
    /// Create a preparer; without a host any needed upload fails
    pub fn new(host: Option<Arc<dyn ImageHost>>, retry: RetryConfig) -> Self {
        Self { host, retry }
    }

    /// Upload the images at the `needed` indices
    pub async fn prepare(
        &self,
        images: &[ImageAttachment],
        needed: &BTreeSet<usize>,
    ) -> Result<PreparedImages> {
        if needed.is_empty() {
            return Ok(PreparedImages::default());
        }
        let host = self
            .host
            .as_ref()
            .ok_or_else(|| Error::ImageUpload("no image host configured".to_string()))?;

        let mut groups: Vec<(Arc<ImageData>, Vec<usize>)> = Vec::new();
        let mut by_digest: HashMap<String, usize> = HashMap::new();
        for &index in needed {
            let Some(attachment) = images.get(index) else {
                continue;
            };
            let digest = attachment.data.digest();
            match by_digest.get(&digest) {
                Some(&group) => groups[group].1.push(index),
                None => {
                    by_digest.insert(digest, groups.len());
                    groups.push((attachment.data.clone(), vec![index]));
                }
            }
        }

        tracing::debug!(
            host = host.name(),
            requested = needed.len(),
            distinct = groups.len(),
            "Uploading images"
        );

        let uploads = groups.iter().map(|(data, _)| {
            let host = host.clone();
            let data = data.clone();
            let retry = &self.retry;
            async move {
                with_retry(retry, || {
                    let host = host.clone();
                    let data = data.clone();
                    async move { host.upload(&data).await }
                })
                .await
            }
        });
        let urls = try_join_all(uploads).await?;

        let mut prepared = HashMap::new();
        for ((_, indices), url) in groups.into_iter().zip(urls) {
            for index in indices {
                prepared.insert(index, url.clone());
            }
        }
        Ok(PreparedImages { urls: prepared })
    }
}
