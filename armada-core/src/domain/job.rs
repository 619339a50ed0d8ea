//! Job domain types
//!
//! A job is a Tekton `PipelineRun`. The orchestrator only reads it; the minion
//! re-creates it from a [`SanitizedJob`].

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::field_tree::FieldTree;

/// API version of the relayed resource kind
pub const JOB_API_VERSION: &str = "tekton.dev/v1";

/// Kind of the relayed resource
pub const JOB_KIND: &str = "PipelineRun";

/// Annotation marking a job for dispatch to a minion
pub const DISPATCH_MARKER: &str = "armada.tekton.dev/orchestrate";

/// Label naming the pipeline that owns a run
pub const PIPELINE_LABEL: &str = "tekton.dev/pipeline";

/// `spec.status` value of a run that has not been started yet
pub const PENDING_STATUS: &str = "PipelineRunPending";

/// Provenance annotation written by `kubectl apply`
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// A live job resource as observed in the controlling cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResource {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: JobSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

/// Run specification: pipeline reference, params, and the pending switch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Runtime status, owned by the cluster that runs the job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl JobResource {
    /// Parses a job from its JSON representation
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace(), self.name())
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(key))
            .map(String::as_str)
    }

    /// True when the dispatch marker annotation is present and set to `"true"`
    pub fn has_dispatch_marker(&self) -> bool {
        self.annotation(DISPATCH_MARKER) == Some("true")
    }

    pub fn is_pending(&self) -> bool {
        self.spec.status.as_deref() == Some(PENDING_STATUS)
    }

    /// True once the execution engine has recorded any condition
    pub fn has_conditions(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| !status.conditions.is_empty())
    }

    /// The owning pipeline label, when present and non-empty
    pub fn owning_pipeline(&self) -> Option<&str> {
        self.label(PIPELINE_LABEL).filter(|p| !p.is_empty())
    }
}

/// Namespace/name identity of a resource within one cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A namespace-agnostic, status-free job template
///
/// Produced by [`crate::sanitize`] on the orchestrator side and by
/// [`crate::decode`] on the minion side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SanitizedJob(FieldTree);

impl SanitizedJob {
    pub(crate) fn from_tree(tree: FieldTree) -> Self {
        Self(tree)
    }

    pub fn tree(&self) -> &FieldTree {
        &self.0
    }

    pub fn into_tree(self) -> FieldTree {
        self.0
    }

    /// Name carried by the template, absent when the cluster generates one
    pub fn name(&self) -> Option<&str> {
        self.0.name()
    }
}
