//! API Error Handling
//!
//! Every failure of the dispatch endpoint is reported as a 500 so the
//! orchestrator retries on its next resync.

use armada_core::CodecError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::Reply;
use crate::service::materialize_service::MaterializeError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// The body is not a dispatch event
    InvalidEvent(String),
    /// The event payload could not be decoded
    Decode(CodecError),
    /// The job could not be re-created
    Materialize(MaterializeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            ApiError::InvalidEvent(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                format!("invalid event: {}", msg)
            }
            ApiError::Decode(err) => {
                tracing::warn!("Failed to decode event: {}", err);
                err.to_string()
            }
            ApiError::Materialize(err) => {
                tracing::error!("Failed to materialize job: {}", err);
                err.to_string()
            }
        };

        let status = StatusCode::INTERNAL_SERVER_ERROR;
        (status, Json(Reply::new(status, message))).into_response()
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::Decode(err)
    }
}

impl From<MaterializeError> for ApiError {
    fn from(err: MaterializeError) -> Self {
        ApiError::Materialize(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
