//! OpenAPI documentation and schema generation
//!
//! The spec is generated at compile time with utoipa and served at
//! `/openapi.json` and through Swagger UI at `/swagger-ui`.

use utoipa::OpenApi;

/// OpenAPI documentation for the publish-all REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "publish-all REST API",
        version = "0.1.0",
        description = "Submit one post to many social platforms and follow its progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::get_job,

        // Single targets
        crate::api::routes::publish_to_target,
        crate::api::routes::list_tumblr_blogs,

        // System
        crate::api::routes::list_targets,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Requests, views and events
        crate::types::JobId,
        crate::types::JobRequest,
        crate::types::DirectPostRequest,
        crate::types::ImageInput,
        crate::types::JobState,
        crate::types::JobStatusView,
        crate::types::TargetStatusView,
        crate::types::TargetStatus,
        crate::types::JobSummary,
        crate::types::FailedTarget,
        crate::types::SummaryStatus,
        crate::types::Event,
        crate::types::StatusRecord,

        // Targets
        crate::publisher::TargetInfo,
        crate::adapters::AdapterCapabilities,
        crate::adapters::ImageDelivery,

        // API responses
        crate::api::routes::SubmitResponse,
        crate::api::routes::DirectPostResponse,
        crate::api::routes::BlogsResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Submit jobs and poll their status"),
        (name = "targets", description = "Publish to a single target and query target accounts"),
        (name = "system", description = "Targets, health checks, OpenAPI spec and live events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the API key and bearer schemes to the spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
