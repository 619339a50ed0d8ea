//! Envelope codec
//!
//! Wraps a sanitized job into a [`DispatchEvent`] and unwraps it again on the
//! minion side. The job travels as base64-encoded YAML so it embeds safely in a
//! single JSON string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::field_tree::FieldTree;
use crate::domain::job::SanitizedJob;
use crate::dto::event::{
    DispatchEvent, DispatchPayload, EVENT_SOURCE, EVENT_TYPE, SPEC_VERSION,
};
use crate::error::CodecError;

/// Builds a dispatch event for `job`, to be created in `namespace`
///
/// Every call produces a fresh event id.
pub fn encode(job: &SanitizedJob, namespace: &str) -> Result<DispatchEvent, CodecError> {
    let encoded = encode_job(job)?;

    Ok(DispatchEvent {
        specversion: SPEC_VERSION.to_string(),
        id: Uuid::new_v4().to_string(),
        source: EVENT_SOURCE.to_string(),
        event_type: EVENT_TYPE.to_string(),
        time: Some(chrono::Utc::now()),
        datacontenttype: Some("application/json".to_string()),
        data: serde_json::json!({ "job": encoded, "namespace": namespace }),
    })
}

/// Extracts the job and target namespace from a dispatch event
pub fn decode(event: &DispatchEvent) -> Result<(SanitizedJob, String), CodecError> {
    let payload: DispatchPayload = serde_json::from_value(event.data.clone())
        .map_err(|e| CodecError::EnvelopeDecode(e.to_string()))?;

    let job = decode_job(&payload.job)?;
    Ok((job, payload.namespace))
}

/// Serializes a job to base64 YAML
pub fn encode_job(job: &SanitizedJob) -> Result<String, CodecError> {
    let yaml = serde_yaml::to_string(job.tree())?;
    Ok(STANDARD.encode(yaml))
}

/// Parses a base64 YAML job
pub fn decode_job(encoded: &str) -> Result<SanitizedJob, CodecError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let value: Value = serde_yaml::from_slice(&bytes)
        .map_err(|e| CodecError::PayloadDeserialize(e.to_string()))?;
    let tree = FieldTree::from_value(value).ok_or_else(|| {
        CodecError::PayloadDeserialize("job payload is not a mapping".to_string())
    })?;

    Ok(SanitizedJob::from_tree(tree))
}
