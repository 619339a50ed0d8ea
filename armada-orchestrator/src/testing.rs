//! Test doubles shared by the reconciler and controller tests

use armada_client::{Acknowledgement, EventSender, TransportError};
use armada_core::domain::job::{DISPATCH_MARKER, PIPELINE_LABEL};
use armada_core::{DispatchEvent, JobResource};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;

/// Records every event instead of sending it
pub struct RecordingSender {
    sent: Mutex<Vec<(DispatchEvent, String)>>,
    reject_with: Option<u16>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject_with: None,
        }
    }

    /// A sender whose every delivery is rejected with `status`
    pub fn failing(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<(DispatchEvent, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSender for RecordingSender {
    async fn send(
        &self,
        event: &DispatchEvent,
        target_url: &str,
    ) -> armada_client::Result<Acknowledgement> {
        self.sent
            .lock()
            .unwrap()
            .push((event.clone(), target_url.to_string()));

        match self.reject_with {
            Some(status) => Err(TransportError::rejected(status, "rejected")),
            None => Ok(Acknowledgement {
                status: 202,
                message: "created".to_string(),
            }),
        }
    }
}

/// A marked, pending, never-started run owned by pipeline `ci` in namespace `ci`
pub fn pending_job(name: &str) -> JobResource {
    JobResource::from_value(json!({
        "apiVersion": "tekton.dev/v1",
        "kind": "PipelineRun",
        "metadata": {
            "name": name,
            "namespace": "ci",
            "uid": "9f0c3a55-6c1e-4a3b-8d2f-2b6f1d7e4c90",
            "resourceVersion": "1042",
            "annotations": { DISPATCH_MARKER: "true" },
            "labels": { PIPELINE_LABEL: "ci" }
        },
        "spec": {
            "status": "PipelineRunPending",
            "pipelineRef": { "name": "ci" },
            "params": [{ "name": "revision", "value": "main" }]
        },
        "status": null
    }))
    .unwrap()
}
