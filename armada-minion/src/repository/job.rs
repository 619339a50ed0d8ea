//! Job Repository
//!
//! Reads, creates and deletes job resources in the local cluster.

use armada_core::FieldTree;
use armada_core::domain::job::{JOB_API_VERSION, JOB_KIND};
use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, PostParams};
use kube::runtime::wait::{await_condition, conditions};
use std::time::Duration;
use thiserror::Error;
use tokio::time;

/// Repository error type
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} is still terminating")]
    Terminating {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("cluster request failed: {0}")]
    Apply(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// State of a job right after it was asked to go away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    Gone,
    /// Finalizers still hold the object with this uid
    Terminating { uid: String },
}

/// Cluster operations the receiver needs
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Fetches a job by name
    async fn get(&self, namespace: &str, name: &str) -> Result<FieldTree>;

    /// Creates a job and returns the object as stored by the cluster
    async fn create(&self, namespace: &str, job: &FieldTree) -> Result<FieldTree>;

    /// Deletes a job by name
    async fn delete(&self, namespace: &str, name: &str) -> Result<Deletion>;

    /// Waits until the object with `uid` is gone
    ///
    /// Fails with [`RepositoryError::Terminating`] when it outlives the
    /// repository's deletion timeout.
    async fn wait_deleted(&self, namespace: &str, name: &str, uid: &str) -> Result<()>;
}

/// Job repository backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeJobRepository {
    client: Client,
    resource: ApiResource,
    deletion_timeout: Duration,
}

impl KubeJobRepository {
    pub fn new(client: Client, deletion_timeout: Duration) -> Self {
        let (group, version) = JOB_API_VERSION
            .split_once('/')
            .unwrap_or(("", JOB_API_VERSION));
        Self {
            client,
            resource: ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, JOB_KIND)),
            deletion_timeout,
        }
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }

    fn classify(&self, namespace: &str, name: &str, err: kube::Error) -> RepositoryError {
        match err {
            kube::Error::Api(response) if response.code == 404 => RepositoryError::NotFound {
                kind: JOB_KIND.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            other => RepositoryError::Apply(other.to_string()),
        }
    }
}

fn to_tree(object: &DynamicObject) -> Result<FieldTree> {
    let value = serde_json::to_value(object).map_err(|e| RepositoryError::Apply(e.to_string()))?;
    FieldTree::from_value(value)
        .ok_or_else(|| RepositoryError::Apply("cluster returned a non-object".to_string()))
}

#[async_trait]
impl JobRepository for KubeJobRepository {
    async fn get(&self, namespace: &str, name: &str) -> Result<FieldTree> {
        let object = self
            .api(namespace)
            .get(name)
            .await
            .map_err(|e| self.classify(namespace, name, e))?;
        to_tree(&object)
    }

    async fn create(&self, namespace: &str, job: &FieldTree) -> Result<FieldTree> {
        let object: DynamicObject = serde_json::from_value(job.clone().into_value())
            .map_err(|e| RepositoryError::Apply(format!("invalid job object: {}", e)))?;

        let created = self
            .api(namespace)
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| self.classify(namespace, job.name().unwrap_or_default(), e))?;
        to_tree(&created)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<Deletion> {
        let remaining = self
            .api(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map_err(|e| self.classify(namespace, name, e))?
            .left();

        Ok(match remaining {
            Some(object) => Deletion::Terminating {
                uid: object.metadata.uid.unwrap_or_default(),
            },
            None => Deletion::Gone,
        })
    }

    async fn wait_deleted(&self, namespace: &str, name: &str, uid: &str) -> Result<()> {
        let gone = await_condition(self.api(namespace), name, conditions::is_deleted(uid));

        match time::timeout(self.deletion_timeout, gone).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RepositoryError::Apply(e.to_string())),
            Err(_) => Err(RepositoryError::Terminating {
                kind: JOB_KIND.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }
}
