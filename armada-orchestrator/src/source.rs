//! Kubernetes job source
//!
//! Watches `PipelineRun` resources and forwards every change to the
//! controller as a [`Notification`]. Watch errors are retried with backoff by
//! the kube runtime. A re-list after reconnecting carries no deletes for
//! objects removed during the gap, so its full key set is forwarded as
//! [`Notification::Relisted`] once it completes.

use anyhow::Result;
use armada_core::domain::job::{JOB_API_VERSION, JOB_KIND};
use armada_core::{JobResource, ObjectKey};
use futures::StreamExt;
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::runtime::{WatchStreamExt, watcher};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::controller::Notification;

/// API resource descriptor of the relayed job kind
pub fn job_api_resource() -> ApiResource {
    let (group, version) = JOB_API_VERSION
        .split_once('/')
        .unwrap_or(("", JOB_API_VERSION));
    ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, JOB_KIND))
}

/// Converts a watched object into a job resource
pub fn to_job(object: &DynamicObject) -> Result<JobResource, serde_json::Error> {
    JobResource::from_value(serde_json::to_value(object)?)
}

fn object_key(object: &DynamicObject) -> ObjectKey {
    ObjectKey::new(
        object.metadata.namespace.clone().unwrap_or_default(),
        object.metadata.name.clone().unwrap_or_default(),
    )
}

/// Maps watcher events to notifications, tracking re-list boundaries
#[derive(Debug, Default)]
struct EventMapper {
    /// Keys seen since the current re-list started
    relisted: Option<HashSet<ObjectKey>>,
}

impl EventMapper {
    fn map(&mut self, event: watcher::Event<DynamicObject>) -> Option<Notification> {
        match event {
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                None
            }
            watcher::Event::InitApply(object) => {
                if let Some(keys) = self.relisted.as_mut() {
                    keys.insert(object_key(&object));
                }
                applied(&object)
            }
            watcher::Event::InitDone => self.relisted.take().map(Notification::Relisted),
            watcher::Event::Apply(object) => applied(&object),
            watcher::Event::Delete(object) => Some(Notification::Deleted(object_key(&object))),
        }
    }
}

fn applied(object: &DynamicObject) -> Option<Notification> {
    match to_job(object) {
        Ok(job) => Some(Notification::Applied(job)),
        Err(e) => {
            // the cached state, if any, is kept until the object converts again
            error!(
                "Failed to convert {} {}, it will not be reconciled: {}",
                JOB_KIND,
                object_key(object),
                e
            );
            None
        }
    }
}

/// Streams job notifications into `notifications` until the receiver closes
///
/// # Arguments
/// * `client` - Kubernetes client
/// * `namespace` - Namespace to watch; all namespaces when `None`
/// * `notifications` - Channel consumed by the controller
pub async fn watch_jobs(
    client: Client,
    namespace: Option<String>,
    notifications: mpsc::Sender<Notification>,
) -> Result<()> {
    let resource = job_api_resource();
    let api: Api<DynamicObject> = match namespace.as_deref() {
        Some(ns) => Api::namespaced_with(client, ns, &resource),
        None => Api::all_with(client, &resource),
    };

    info!(
        "Watching {} resources in {}",
        JOB_KIND,
        namespace.as_deref().unwrap_or("all namespaces")
    );

    let mut stream = watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed();
    let mut mapper = EventMapper::default();

    while let Some(event) = stream.next().await {
        let notification = match event {
            Ok(event) => match mapper.map(event) {
                Some(notification) => notification,
                None => continue,
            },
            Err(e) => {
                warn!("Watch error: {}", e);
                continue;
            }
        };

        if notifications.send(notification).await.is_err() {
            info!("Controller stopped, ending watch");
            break;
        }
    }

    Ok(())
}
