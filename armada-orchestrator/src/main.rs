//! Armada Orchestrator
//!
//! Watches Tekton `PipelineRun`s in the controlling cluster and forwards the
//! ones marked for dispatch to a minion controller.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Source: Kubernetes watch producing job notifications
//! - Controller: Marker filter, latest-state cache, work queue, resync ticker
//! - Reconciler: Eligibility check, then sanitize, encode and send
//!
//! Delivery is at least once: a job that stays eligible is sent again on
//! every resync until the execution engine picks it up.

mod config;
mod controller;
mod reconciler;
mod source;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use armada_client::{DispatchClient, EventSender};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::controller::Controller;
use crate::reconciler::DispatchReconciler;

/// Capacity of the channel between the watch and the controller
const NOTIFICATION_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "armada_orchestrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Armada Orchestrator");

    let config = load_config()?;
    info!(
        "Loaded configuration: minion_url={}, watch_namespace={}, workers={}",
        config.minion_url,
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.workers
    );

    let sender: Arc<dyn EventSender> = Arc::new(
        DispatchClient::with_config(&config.client_config())
            .context("Failed to build dispatch client")?,
    );
    let reconciler = DispatchReconciler::new(
        sender,
        config.minion_url.clone(),
        config.target_namespace.clone(),
    );
    let controller = Arc::new(Controller::new(
        reconciler,
        config.workers,
        config.resync_period,
    ));

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
    let watch = tokio::spawn(source::watch_jobs(
        client,
        config.watch_namespace.clone(),
        tx,
    ));

    tokio::select! {
        _ = Arc::clone(&controller).run(rx) => {
            error!("Controller stopped unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    watch.abort();
    info!("Orchestrator stopped");

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            info!("{}, using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
