//! Dispatch reconciler
//!
//! Decides whether a job is ready to be handed to the minion and, if so,
//! sanitizes, encodes and sends it. The job itself is never modified: once the
//! execution engine records a condition the job stops being eligible, and any
//! later notification for it is skipped.

use armada_client::{EventSender, TransportError};
use armada_core::{CodecError, JobResource, SanitizeError, encode, sanitize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Why a job was not dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Dispatch marker absent or not `"true"`
    NotMarked,
    /// `spec.status` is not pending
    NotPending,
    /// The execution engine already recorded conditions
    AlreadyStarted,
    /// No owning pipeline label; left to the local engine
    NoOwningPipeline,
}

/// Result of one reconcile pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Dispatched { event_id: String },
    Skipped(SkipReason),
}

/// Errors surfaced to the controller; the job is retried on the next resync
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Checks whether a job should be forwarded right now
pub fn check_eligibility(job: &JobResource) -> Result<(), SkipReason> {
    if !job.has_dispatch_marker() {
        return Err(SkipReason::NotMarked);
    }
    if !job.is_pending() {
        return Err(SkipReason::NotPending);
    }
    if job.has_conditions() {
        return Err(SkipReason::AlreadyStarted);
    }
    if job.owning_pipeline().is_none() {
        return Err(SkipReason::NoOwningPipeline);
    }
    Ok(())
}

/// Forwards eligible jobs to a single minion endpoint
pub struct DispatchReconciler {
    sender: Arc<dyn EventSender>,
    minion_url: String,
    target_namespace: Option<String>,
}

impl DispatchReconciler {
    /// Creates a reconciler
    ///
    /// # Arguments
    /// * `sender` - Transport used for delivery
    /// * `minion_url` - Minion endpoint every event is sent to
    /// * `target_namespace` - Namespace on the minion side; the source job's
    ///   namespace when `None`
    pub fn new(
        sender: Arc<dyn EventSender>,
        minion_url: String,
        target_namespace: Option<String>,
    ) -> Self {
        Self {
            sender,
            minion_url,
            target_namespace,
        }
    }

    pub async fn reconcile(&self, job: &JobResource) -> Result<Outcome, ReconcileError> {
        if let Err(reason) = check_eligibility(job) {
            debug!("Skipping PipelineRun {}: {:?}", job.key(), reason);
            return Ok(Outcome::Skipped(reason));
        }

        info!(
            "Reconciling PipelineRun {}, status: {}",
            job.key(),
            job.spec.status.as_deref().unwrap_or_default()
        );

        let sanitized = sanitize(job)?;
        let namespace = self
            .target_namespace
            .as_deref()
            .unwrap_or_else(|| job.namespace());
        let event = encode(&sanitized, namespace)?;

        info!(
            "Sending PipelineRun {} to minion {} as event {}",
            job.key(),
            self.minion_url,
            event.id
        );
        let ack = self.sender.send(&event, &self.minion_url).await?;
        debug!("Minion acknowledged event {}: {}", event.id, ack.message);

        Ok(Outcome::Dispatched { event_id: event.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSender, pending_job};
    use armada_core::decode;
    use armada_core::domain::job::{Condition, DISPATCH_MARKER, JobStatus, PIPELINE_LABEL};

    fn reconciler(sender: Arc<RecordingSender>, target: Option<&str>) -> DispatchReconciler {
        DispatchReconciler::new(
            sender,
            "http://minion:8081/".to_string(),
            target.map(str::to_string),
        )
    }

    #[test]
    fn test_eligible_job() {
        assert_eq!(check_eligibility(&pending_job("build-1")), Ok(()));
    }

    #[test]
    fn test_marker_required() {
        let mut job = pending_job("build-1");
        job.metadata.annotations.as_mut().unwrap().remove(DISPATCH_MARKER);
        assert_eq!(check_eligibility(&job), Err(SkipReason::NotMarked));
    }

    #[test]
    fn test_pending_required() {
        let mut job = pending_job("build-1");
        job.spec.status = None;
        assert_eq!(check_eligibility(&job), Err(SkipReason::NotPending));

        job.spec.status = Some("Cancelled".to_string());
        assert_eq!(check_eligibility(&job), Err(SkipReason::NotPending));
    }

    #[test]
    fn test_started_job_skipped() {
        let mut job = pending_job("build-1");
        job.status = Some(JobStatus {
            conditions: vec![Condition {
                condition_type: "Succeeded".to_string(),
                status: "Unknown".to_string(),
                reason: Some("PipelineRunPending".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        });
        assert_eq!(check_eligibility(&job), Err(SkipReason::AlreadyStarted));
    }

    #[test]
    fn test_owning_pipeline_required() {
        let mut job = pending_job("build-1");
        job.metadata.labels.as_mut().unwrap().remove(PIPELINE_LABEL);
        assert_eq!(check_eligibility(&job), Err(SkipReason::NoOwningPipeline));
    }

    #[tokio::test]
    async fn test_unmarked_job_never_sent() {
        let sender = Arc::new(RecordingSender::new());
        let mut job = pending_job("build-1");
        job.metadata.annotations = None;

        let outcome = reconciler(sender.clone(), None).reconcile(&job).await.unwrap();

        assert_eq!(outcome, Outcome::Skipped(SkipReason::NotMarked));
        assert_eq!(sender.calls(), 0);
    }

    #[tokio::test]
    async fn test_eligible_job_sent_once() {
        let sender = Arc::new(RecordingSender::new());
        let job = pending_job("build-1");

        let outcome = reconciler(sender.clone(), None).reconcile(&job).await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "http://minion:8081/");
        assert_eq!(
            outcome,
            Outcome::Dispatched {
                event_id: sent[0].0.id.clone()
            }
        );

        let (descriptor, namespace) = decode(&sent[0].0).unwrap();
        assert_eq!(namespace, "ci");
        assert_eq!(descriptor.name(), Some("build-1"));
        assert!(!descriptor.tree().contains("status"));
    }

    #[tokio::test]
    async fn test_target_namespace_override() {
        let sender = Arc::new(RecordingSender::new());

        reconciler(sender.clone(), Some("remote"))
            .reconcile(&pending_job("build-1"))
            .await
            .unwrap();

        let (_, namespace) = decode(&sender.sent()[0].0).unwrap();
        assert_eq!(namespace, "remote");
    }

    #[tokio::test]
    async fn test_transport_failure_surfaced() {
        let sender = Arc::new(RecordingSender::failing(500));

        let err = reconciler(sender.clone(), None)
            .reconcile(&pending_job("build-1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Transport(TransportError::Rejected { status: 500, .. })
        ));
        assert_eq!(sender.calls(), 1);
    }

    #[tokio::test]
    async fn test_replayed_notification_dispatches_again() {
        let sender = Arc::new(RecordingSender::new());
        let reconciler = reconciler(sender.clone(), None);
        let job = pending_job("build-1");

        reconciler.reconcile(&job).await.unwrap();
        reconciler.reconcile(&job).await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0].0.id, sent[1].0.id);
    }
}
