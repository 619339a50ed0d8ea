//! API Module
//!
//! HTTP API layer for the minion.

pub mod error;
pub mod event;
pub mod health;

use armada_core::ManifestRegistry;
use axum::{
    Router,
    http::StatusCode,
    routing::{any, get},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::repository::job_repository::JobRepository;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn JobRepository>,
    pub registry: Arc<ManifestRegistry>,
    /// Namespace used when an event does not name one
    pub default_namespace: String,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        registry: ManifestRegistry,
        default_namespace: String,
    ) -> Self {
        Self {
            repository,
            registry: Arc::new(registry),
            default_namespace,
        }
    }
}

/// JSON body of every dispatch endpoint response
#[derive(Debug, Serialize)]
pub struct Reply {
    pub status: u16,
    pub message: String,
    #[serde(rename = "eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl Reply {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            event_id: None,
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }
}

/// Create the main API router with all endpoints
///
/// A request still running after `handler_timeout` is answered with 503.
pub fn create_router(state: AppState, handler_timeout: Duration) -> Router {
    Router::new()
        // Dispatch endpoint; other methods answer as a probe
        .route("/", any(event::receive_event))
        // Health check
        .route("/live", get(health::live))
        // Add state and middleware
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            handler_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}
