//! Dispatch event DTOs
//!
//! The envelope follows the CloudEvents JSON format so the minion endpoint can
//! also sit behind an event broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CloudEvents specification version emitted by the orchestrator
pub const SPEC_VERSION: &str = "1.0";

/// Source of every event emitted by the orchestrator
pub const EVENT_SOURCE: &str = "/apis/armada.tekton.dev/orchestrator";

/// Type of a job dispatch event
pub const EVENT_TYPE: &str = "dev.tekton.armada.job.dispatch.v1";

/// Content type of the structured event body
pub const EVENT_CONTENT_TYPE: &str = "application/cloudevents+json; charset=utf-8";

/// Envelope carrying one sanitized job to a minion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub specversion: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    /// Left untyped so a malformed payload is reported by the codec
    #[serde(default)]
    pub data: Value,
}

/// Event data: a base64 YAML job plus the namespace to create it in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    pub job: String,
    /// Empty when the sender leaves placement to the minion
    #[serde(default)]
    pub namespace: String,
}
