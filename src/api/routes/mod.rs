//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`publish`] - Job submission
//! - [`jobs`] - Job status
//! - [`direct`] - Single-target posts and account queries
//! - [`system`] - Targets, health, events, OpenAPI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{JobId, TargetStatus};

mod direct;
mod jobs;
mod publish;
mod system;

pub use direct::*;
pub use jobs::*;
pub use publish::*;
pub use system::*;

/// Response for POST /publish-all/post
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Id to poll and to match events against
    pub job_id: JobId,
}

/// Response for POST /:target/post
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectPostResponse {
    /// Canonical target identifier
    pub target: String,
    /// `success` or `scheduled`
    pub status: TargetStatus,
    /// When a scheduled post goes out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub retry_at: Option<DateTime<Utc>>,
    /// Platform response
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

/// Response for GET /tumblr/blogs
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BlogsResponse {
    /// Blog names
    pub blogs: Vec<String>,
}

/// Query parameters for GET /events
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct EventsQuery {
    /// Only stream events for this job
    pub job_id: Option<String>,
}
