//! Dispatch Event Handler
//!
//! Receives jobs sent by the orchestrator and re-creates them locally.

use armada_core::decode;
use armada_core::dto::event::{DispatchEvent, EVENT_TYPE};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::{AppState, Reply};
use crate::service::materialize_service;

/// ANY /
/// Creates the job carried by a POSTed dispatch event
///
/// Other methods get a plain 200 so the route doubles as a probe target.
pub async fn receive_event(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Reply>)> {
    if method != Method::POST {
        return Ok((StatusCode::OK, Json(Reply::new(StatusCode::OK, "ok"))));
    }

    let event: DispatchEvent =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidEvent(e.to_string()))?;

    if event.event_type != EVENT_TYPE {
        tracing::info!("Skipping event {} of type {}", event.id, event.event_type);
        return Ok((
            StatusCode::OK,
            Json(Reply::new(StatusCode::OK, "skipped event").with_event_id(event.id)),
        ));
    }

    tracing::info!("Received event {} from {}", event.id, event.source);

    let (job, namespace) = decode(&event)?;
    let namespace = if namespace.trim().is_empty() {
        state.default_namespace.clone()
    } else {
        namespace
    };

    let created = materialize_service::materialize(
        state.repository.as_ref(),
        &state.registry,
        job,
        &namespace,
    )
    .await?;

    tracing::info!(
        "Event {} {} PipelineRun {}/{}",
        event.id,
        if created.replaced { "replaced" } else { "created" },
        created.namespace,
        created.name
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(Reply::new(StatusCode::ACCEPTED, "created").with_event_id(event.id)),
    ))
}
