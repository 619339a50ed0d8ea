//! Health Check API Handler

use axum::{http::StatusCode, response::IntoResponse};

/// GET /live
/// Liveness probe
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
