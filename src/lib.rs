//! # publish-all
//!
//! Publish one post to many social platforms from a single request.
//!
//! A job names its targets, its text, tags and images, and optional
//! per-target settings. Every target is attempted in order and isolated from
//! the others: a failing, hanging or panicking platform never stops the rest.
//! Progress is reported after each target and a summary closes every job.
//!
//! ## Design Philosophy
//!
//! publish-all is designed to be:
//! - **Isolated per target** - One bad platform never sinks a job
//! - **Event-driven** - Consumers subscribe to progress and summary events
//! - **Durable** - Per-target status survives restarts, interrupted jobs are reconciled
//! - **Pluggable** - Platforms, image hosts and notifiers sit behind traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use publish_all::{Config, JobRequest, Publisher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default().with_env_credentials();
//!     let publisher = Publisher::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = publisher.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let job_id = publisher
//!         .submit(JobRequest {
//!             targets: vec!["bluesky".into(), "twitter".into()],
//!             text: Some("Hello from everywhere".into()),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("submitted {job_id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Platform adapters and the registry that resolves them
pub mod adapters;
/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Per-target content assembly and image preparation
pub mod content;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Image hosting for platforms that take image URLs
pub mod image_host;
/// Progress and summary delivery
pub mod notify;
/// Sequential per-target dispatch of a job
pub mod orchestrator;
/// Service facade: submission, status, shutdown
pub mod publisher;
/// Retry logic with exponential backoff
pub mod retry;
/// Status persistence seam
pub mod status;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use adapters::{AdapterCapabilities, AdapterRegistry, ImageDelivery, TargetAdapter};
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus, ValidationError,
};
pub use image_host::ImageHost;
pub use notify::ProgressNotifier;
pub use orchestrator::JobOrchestrator;
pub use publisher::Publisher;
pub use status::StatusRecorder;
pub use types::{
    DirectPostRequest, Event, FailedTarget, Job, JobId, JobRequest, JobState, JobStatusView,
    JobSummary, StatusRecord, TargetResult, TargetStatus,
};

/// Helper function to run the publisher with graceful signal handling.
///
/// Waits for a termination signal and then calls the publisher's `shutdown()` method,
/// which stops intake and gives running jobs `publish.shutdown_timeout` to finish.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use publish_all::{Config, Publisher, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let publisher = Publisher::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(publisher).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(publisher: Publisher) -> Result<()> {
    wait_for_signal().await;
    publisher.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
