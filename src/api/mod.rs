//! REST API server module
//!
//! Job submission, status polling, live events and service metadata.

use crate::{Config, Publisher, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /publish-all/post` - Submit a job (202 with the job id)
/// - `POST /jobs` - Same as above
/// - `GET /jobs/:id` - Job state, per-target status and summary
///
/// ## Single targets
/// - `POST /:target/post` - Publish to one target and wait (201 with the result)
/// - `GET /tumblr/blogs` - Blogs of the configured Tumblr account
///
/// ## System
/// - `GET /targets` - Configured targets and capabilities
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream (`?job_id=` to filter)
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(publisher: Arc<Publisher>, config: Arc<Config>) -> Router {
    let state = AppState::new(publisher, config.clone());

    let router = Router::new()
        // Jobs
        .route("/publish-all/post", post(routes::submit_job))
        .route("/jobs", post(routes::submit_job))
        .route("/jobs/:id", get(routes::get_job))
        // Single targets
        .route("/:target/post", post(routes::publish_to_target))
        .route("/tumblr/blogs", get(routes::list_tumblr_blogs))
        // System
        .route("/targets", get(routes::list_targets))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Swagger UI serves its own copy of the spec so it cannot clash with /openapi.json
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // Images arrive inline as base64, far beyond axum's 2 MB default
    let router = router
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_body_bytes));

    let router = if config.api.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    let router = router.layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until `shutdown` resolves, then stops accepting connections and
/// lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use publish_all::{Publisher, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let publisher = Arc::new(Publisher::new((*config).clone()).await?);
///
/// publish_all::api::start_api_server(publisher, config, async {
///     tokio::signal::ctrl_c().await.ok();
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(
    publisher: Arc<Publisher>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(publisher, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
