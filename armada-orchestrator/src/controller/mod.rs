//! Controller
//!
//! Turns watch notifications into reconcile calls:
//! - only marked jobs are cached and queued
//! - the latest observed object per key is reconciled, never a stale one
//! - every cached key is queued again on each resync tick
//! - a completed re-list drops cached keys it did not list
//! - a fixed pool of workers drains the queue, one key per worker at a time

mod queue;

use armada_core::{JobResource, ObjectKey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::reconciler::{DispatchReconciler, Outcome};
use queue::WorkQueue;

/// A change observed on a job resource
#[derive(Debug, Clone)]
pub enum Notification {
    /// The job was created or updated; carries the full current object
    Applied(JobResource),
    /// The job is gone
    Deleted(ObjectKey),
    /// A full re-list completed; carries every key that still exists
    Relisted(HashSet<ObjectKey>),
}

pub struct Controller {
    reconciler: DispatchReconciler,
    queue: WorkQueue,
    /// Latest observed state of every marked job
    cache: RwLock<HashMap<ObjectKey, JobResource>>,
    workers: usize,
    resync_period: Duration,
}

impl Controller {
    pub fn new(reconciler: DispatchReconciler, workers: usize, resync_period: Duration) -> Self {
        Self {
            reconciler,
            queue: WorkQueue::new(),
            cache: RwLock::new(HashMap::new()),
            workers: workers.max(1),
            resync_period,
        }
    }

    /// Records a notification and queues the job if it carries the marker
    pub async fn handle(&self, notification: Notification) {
        match notification {
            Notification::Applied(job) => {
                let key = job.key();
                if !job.has_dispatch_marker() {
                    // the marker may have been removed since we last saw it
                    self.cache.write().await.remove(&key);
                    return;
                }
                self.cache.write().await.insert(key.clone(), job);
                self.queue.add(key).await;
            }
            Notification::Deleted(key) => {
                if self.cache.write().await.remove(&key).is_some() {
                    debug!("Forgot deleted PipelineRun {}", key);
                }
            }
            Notification::Relisted(keys) => {
                let mut cache = self.cache.write().await;
                let before = cache.len();
                cache.retain(|key, _| keys.contains(key));
                let pruned = before - cache.len();
                if pruned > 0 {
                    info!("Forgot {} PipelineRun(s) missing from re-list", pruned);
                }
            }
        }
    }

    /// Queues every known marked job again
    pub async fn resync(&self) {
        let keys: Vec<ObjectKey> = self.cache.read().await.keys().cloned().collect();
        debug!(
            "Resyncing {} PipelineRun(s), {} already queued",
            keys.len(),
            self.queue.len().await
        );
        for key in keys {
            self.queue.add(key).await;
        }
    }

    /// Reconciles the next queued key
    ///
    /// Waits until a key is available; returns `None` after shutdown.
    pub async fn process_next(&self) -> Option<ObjectKey> {
        let key = self.queue.pop().await?;
        self.reconcile_key(&key).await;
        self.queue.done(&key).await;
        Some(key)
    }

    async fn reconcile_key(&self, key: &ObjectKey) {
        let job = self.cache.read().await.get(key).cloned();
        let Some(job) = job else {
            debug!("PipelineRun {} no longer tracked, skipping", key);
            return;
        };

        match self.reconciler.reconcile(&job).await {
            Ok(Outcome::Dispatched { event_id }) => {
                info!("Dispatched PipelineRun {} as event {}", key, event_id);
            }
            Ok(Outcome::Skipped(reason)) => {
                debug!("PipelineRun {} not dispatched: {:?}", key, reason);
            }
            Err(e) => {
                // picked up again by the next resync or notification
                error!("Failed to reconcile PipelineRun {}: {}", key, e);
            }
        }
    }

    /// Runs workers and the resync ticker until `notifications` closes
    pub async fn run(self: Arc<Self>, mut notifications: mpsc::Receiver<Notification>) {
        info!(
            "Starting controller ({} workers, resync every {:?})",
            self.workers, self.resync_period
        );

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let controller = Arc::clone(&self);
            handles.push(tokio::spawn(async move {
                while controller.process_next().await.is_some() {}
            }));
        }

        let mut ticker = time::interval(self.resync_period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                notification = notifications.recv() => match notification {
                    Some(notification) => self.handle(notification).await,
                    None => break,
                },
                _ = ticker.tick() => self.resync().await,
            }
        }

        info!("Notification stream closed, stopping workers");
        self.queue.shutdown().await;
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker task panicked: {}", e);
            }
        }
    }
}
