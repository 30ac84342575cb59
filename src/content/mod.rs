//! Content routing
//!
//! A job carries one shared payload. Each target receives the subset of
//! images whose affinity matches it, truncated to what its adapter accepts.
//! Routing is pure and never fails.

use std::sync::Arc;

use crate::adapters::canonical_id;
use crate::types::{ImageAttachment, ImageData, Job};

pub mod data_url;
mod images;

pub use images::{ImagePreparer, PreparedImages};

/// Indices of the images routed to `target`, in input order
///
/// An attachment matches when its affinity is empty or names `target`
/// (compared by canonical identifier).
pub fn route_indices(images: &[ImageAttachment], target: &str) -> Vec<usize> {
    let target = canonical_id(target);
    images
        .iter()
        .enumerate()
        .filter(|(_, image)| {
            image.affinity.is_empty() || image.affinity.iter().any(|a| canonical_id(a) == target)
        })
        .map(|(index, _)| index)
        .collect()
}

/// Images routed to `target`, in input order
pub fn route(images: &[ImageAttachment], target: &str) -> Vec<ImageAttachment> {
    route_indices(images, target)
        .into_iter()
        .map(|index| images[index].clone())
        .collect()
}

/// One image as handed to an adapter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentImage {
    /// Position in the job's image list
    pub index: usize,
    /// Decoded payload
    pub data: Arc<ImageData>,
    /// Public URL, set for adapters that take hosted images
    pub hosted_url: Option<String>,
}

/// What a single target publishes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishContent {
    /// Post text
    pub text: Option<String>,
    /// Tags, unformatted
    pub tags: Vec<String>,
    /// Routed images
    pub images: Vec<ContentImage>,
}

impl PublishContent {
    /// Route the job's content to `target`, keeping at most `max_images` images
    pub fn for_target(job: &Job, target: &str, max_images: Option<usize>) -> Self {
        let limit = max_images.unwrap_or(usize::MAX);
        let images = route_indices(&job.images, target)
            .into_iter()
            .take(limit)
            .map(|index| ContentImage {
                index,
                data: job.images[index].data.clone(),
                hosted_url: None,
            })
            .collect();

        Self {
            text: job.text.clone(),
            tags: job.tags.clone(),
            images,
        }
    }

    /// Fill in hosted URLs
    ///
    /// Returns the index of the first image that has no URL.
    pub fn with_hosted_urls(mut self, prepared: &PreparedImages) -> Result<Self, usize> {
        for image in &mut self.images {
            let url = prepared.url(image.index).ok_or(image.index)?;
            image.hosted_url = Some(url.to_string());
        }
        Ok(self)
    }

    /// Post text, empty when unset
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Whether there is non-blank text
    pub fn has_text(&self) -> bool {
        !self.text().trim().is_empty()
    }
}
