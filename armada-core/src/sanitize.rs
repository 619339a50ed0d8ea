//! Sanitizer
//!
//! Converts a live job into a template that can be shipped to another cluster
//! and applied there. Everything that is only meaningful in the source cluster
//! (status, identity, provenance, placement) is stripped.

use crate::domain::field_tree::FieldTree;
use crate::domain::job::{JOB_API_VERSION, JOB_KIND, JobResource, LAST_APPLIED_ANNOTATION, SanitizedJob};
use crate::error::SanitizeError;

/// Metadata fields owned by the source cluster
const CLUSTER_METADATA_FIELDS: &[&str] = &[
    "managedFields",
    "resourceVersion",
    "uid",
    "finalizers",
    "generation",
    "namespace",
    "creationTimestamp",
    "ownerReferences",
];

/// Spec fields that mirror runtime status
const STATUS_SPEC_FIELDS: &[&str] = &["status", "statusMessage"];

/// Produces a transport-safe descriptor from a live job
pub fn sanitize(job: &JobResource) -> Result<SanitizedJob, SanitizeError> {
    let value =
        serde_json::to_value(job).map_err(|e| SanitizeError::Conversion(e.to_string()))?;
    let mut tree = FieldTree::from_value(value)
        .ok_or_else(|| SanitizeError::Conversion("job is not an object".to_string()))?;

    strip_for_export(&mut tree)?;
    tree.set_type_meta(JOB_API_VERSION, JOB_KIND);

    Ok(SanitizedJob::from_tree(tree))
}

fn strip_for_export(tree: &mut FieldTree) -> Result<(), SanitizeError> {
    tree.remove_nested(&["status"]);

    for field in CLUSTER_METADATA_FIELDS {
        tree.remove_nested(&["metadata", field]);
    }
    tree.remove_nested(&["metadata", "annotations", LAST_APPLIED_ANNOTATION]);

    // a generated name must be regenerated by the receiving cluster
    let generated = tree
        .nested_string(&["metadata", "generateName"])
        .map_err(|e| SanitizeError::FieldRemoval(e.to_string()))?
        .is_some();
    if generated {
        tree.remove_nested(&["metadata", "name"]);
    }

    for field in STATUS_SPEC_FIELDS {
        tree.remove_nested(&["spec", field]);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{DISPATCH_MARKER, PIPELINE_LABEL};
    use serde_json::json;

    fn live_run() -> JobResource {
        JobResource::from_value(json!({
            "apiVersion": "tekton.dev/v1",
            "kind": "PipelineRun",
            "metadata": {
                "name": "build-1",
                "namespace": "ci",
                "uid": "4b1f6a3e-5d0c-4c1b-9a55-0a1f1c0b7e11",
                "resourceVersion": "81234",
                "generation": 3,
                "creationTimestamp": "2024-05-01T10:00:00Z",
                "finalizers": ["armada.tekton.dev"],
                "managedFields": [{ "manager": "kubectl", "operation": "Update" }],
                "ownerReferences": [{
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "name": "owner",
                    "uid": "0d9a2c2e-1111-2222-3333-444455556666"
                }],
                "annotations": {
                    DISPATCH_MARKER: "true",
                    LAST_APPLIED_ANNOTATION: "{\"kind\":\"PipelineRun\"}"
                },
                "labels": { PIPELINE_LABEL: "ci" }
            },
            "spec": {
                "status": "PipelineRunPending",
                "statusMessage": "waiting",
                "pipelineRef": { "name": "ci" }
            },
            "status": {
                "conditions": [{ "type": "Succeeded", "status": "Unknown" }],
                "startTime": "2024-05-01T10:00:01Z"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_strips_cluster_fields() {
        let sanitized = sanitize(&live_run()).unwrap();
        let tree = sanitized.tree();

        assert!(!tree.contains("status"));
        for field in CLUSTER_METADATA_FIELDS {
            assert!(
                tree.nested(&["metadata", field]).is_none(),
                "metadata.{} should be removed",
                field
            );
        }
        assert!(
            tree.nested(&["metadata", "annotations", LAST_APPLIED_ANNOTATION])
                .is_none()
        );
        assert!(tree.nested(&["spec", "status"]).is_none());
        assert!(tree.nested(&["spec", "statusMessage"]).is_none());
    }

    #[test]
    fn test_keeps_template_fields() {
        let sanitized = sanitize(&live_run()).unwrap();
        let tree = sanitized.tree();

        assert_eq!(sanitized.name(), Some("build-1"));
        assert_eq!(
            tree.nested_str(&["metadata", "annotations", DISPATCH_MARKER]),
            Some("true")
        );
        assert_eq!(
            tree.nested_str(&["metadata", "labels", PIPELINE_LABEL]),
            Some("ci")
        );
        assert_eq!(tree.nested(&["spec", "pipelineRef"]), Some(&json!({ "name": "ci" })));
    }

    #[test]
    fn test_stamps_type_meta() {
        let mut job = live_run();
        job.api_version = String::new();
        job.kind = "pipelinerun".to_string();

        let sanitized = sanitize(&job).unwrap();
        assert_eq!(sanitized.tree().kind(), Some(JOB_KIND));
        assert_eq!(sanitized.tree().api_version(), Some(JOB_API_VERSION));
    }

    #[test]
    fn test_generate_name_drops_name() {
        let mut job = live_run();
        job.metadata.generate_name = Some("build-".to_string());

        let sanitized = sanitize(&job).unwrap();
        assert_eq!(sanitized.name(), None);
        assert_eq!(
            sanitized.tree().nested_str(&["metadata", "generateName"]),
            Some("build-")
        );
    }

    #[test]
    fn test_null_status_is_accepted() {
        let job = JobResource::from_value(json!({
            "metadata": { "name": "build-1" },
            "spec": { "pipelineRef": { "name": "ci" } },
            "status": null
        }))
        .unwrap();

        let sanitized = sanitize(&job).unwrap();
        assert!(!sanitized.tree().contains("status"));
        assert_eq!(sanitized.tree().kind(), Some(JOB_KIND));
    }

    #[test]
    fn test_source_job_is_not_mutated() {
        let job = live_run();
        let before = job.clone();
        sanitize(&job).unwrap();
        assert_eq!(job, before);
    }
}
