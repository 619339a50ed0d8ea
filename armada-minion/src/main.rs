//! Armada Minion
//!
//! Receives jobs dispatched by the orchestrator and re-creates them in the
//! local cluster.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - API: `/` dispatch endpoint and `/live` probe
//! - Service: Stamp, validate and replace-or-create the job
//! - Repository: Kubernetes access to job resources

mod api;
mod config;
mod repository;
mod service;

use anyhow::{Context, Result};
use armada_core::ManifestRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::repository::job_repository::{JobRepository, KubeJobRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "armada_minion=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Armada Minion...");

    let config = Config::from_env()?;
    config.validate()?;
    tracing::info!(
        "Loaded configuration: port={}, default_namespace={}, handler_timeout={:?}, deletion_timeout={:?}",
        config.port,
        config.default_namespace,
        config.handler_timeout,
        config.deletion_timeout
    );

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let repository: Arc<dyn JobRepository> =
        Arc::new(KubeJobRepository::new(client, config.deletion_timeout));

    let state = AppState::new(
        repository,
        ManifestRegistry::standard(),
        config.default_namespace.clone(),
    );
    let app = api::create_router(state, config.handler_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Minion stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Received shutdown signal");
}
