//! publish-all service binary
//!
//! Loads configuration, starts the REST API and drains running jobs on
//! SIGTERM/SIGINT.

use std::sync::Arc;

use publish_all::{Config, Publisher, api, run_with_shutdown};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Env var naming a JSON config file when no path argument is given
const CONFIG_ENV: &str = "PUBLISH_ALL_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok());
    let config = match config_path {
        Some(path) => {
            tracing::info!(path = %path, "Loading configuration file");
            Config::from_json_file(&path)?
        }
        None => Config::default(),
    }
    .with_env_credentials();

    let publisher = Publisher::new(config).await?;
    let config = publisher.get_config();
    tracing::info!(targets = ?publisher.targets().iter().map(|t| &t.id).collect::<Vec<_>>(), "publish-all ready");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(api::start_api_server(
        Arc::new(publisher.clone()),
        config,
        async {
            stop_rx.await.ok();
        },
    ));

    run_with_shutdown(publisher).await?;

    stop_tx.send(()).ok();
    match server.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "API server task failed"),
    }

    Ok(())
}
