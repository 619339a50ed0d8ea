//! In-memory job repository used by the service and API tests

use armada_core::FieldTree;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use super::job::{Deletion, JobRepository, RepositoryError, Result};

/// One recorded repository call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String, String),
    Create(String, String),
    Delete(String, String),
    WaitDeleted(String, String),
}

/// How a delete request plays out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Finalizers {
    /// The job disappears immediately
    #[default]
    Immediate,
    /// The job lingers until it is waited on
    Finish,
    /// The job never goes away
    Stuck,
}

#[derive(Default)]
pub struct MemoryJobRepository {
    jobs: Mutex<BTreeMap<(String, String), FieldTree>>,
    calls: Mutex<Vec<Call>>,
    fail_delete: Option<String>,
    fail_create: Option<String>,
    finalizers: Finalizers,
    create_delay: Option<Duration>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose deletes fail with `message`
    pub fn failing_delete(message: &str) -> Self {
        Self {
            fail_delete: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// A repository whose creates fail with `message`
    pub fn failing_create(message: &str) -> Self {
        Self {
            fail_create: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// A repository whose deleted jobs terminate before they are gone
    pub fn finalizing() -> Self {
        Self {
            finalizers: Finalizers::Finish,
            ..Self::default()
        }
    }

    /// A repository whose deleted jobs never finish terminating
    pub fn stuck_finalizing() -> Self {
        Self {
            finalizers: Finalizers::Stuck,
            ..Self::default()
        }
    }

    /// A repository whose creates take `delay`
    pub fn slow_create(delay: Duration) -> Self {
        Self {
            create_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn insert(&self, namespace: &str, job: FieldTree) {
        let name = job.name().unwrap_or_default().to_string();
        self.jobs
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name), job);
    }

    pub fn job(&self, namespace: &str, name: &str) -> Option<FieldTree> {
        self.jobs
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Names of every job stored in `namespace`
    pub fn names(&self, namespace: &str) -> Vec<String> {
        self.jobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found(namespace: &str, name: &str) -> RepositoryError {
        RepositoryError::NotFound {
            kind: "PipelineRun".to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn get(&self, namespace: &str, name: &str) -> Result<FieldTree> {
        self.record(Call::Get(namespace.to_string(), name.to_string()));
        self.job(namespace, name)
            .ok_or_else(|| Self::not_found(namespace, name))
    }

    async fn create(&self, namespace: &str, job: &FieldTree) -> Result<FieldTree> {
        let mut stored = job.clone();
        let name = match (job.name(), job.nested_str(&["metadata", "generateName"])) {
            (Some(name), _) => name.to_string(),
            (None, Some(prefix)) => {
                let name = format!("{}{:05}", prefix, self.jobs.lock().unwrap().len());
                stored
                    .set_nested(&["metadata", "name"], Value::String(name.clone()))
                    .map_err(|e| RepositoryError::Apply(e.to_string()))?;
                name
            }
            (None, None) => {
                return Err(RepositoryError::Apply(
                    "name or generateName is required".to_string(),
                ));
            }
        };
        self.record(Call::Create(namespace.to_string(), name.clone()));

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.fail_create {
            return Err(RepositoryError::Apply(message.clone()));
        }

        let key = (namespace.to_string(), name.clone());
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&key) {
            return Err(RepositoryError::Apply(format!(
                "pipelineruns \"{}\" already exists",
                name
            )));
        }
        jobs.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<Deletion> {
        self.record(Call::Delete(namespace.to_string(), name.to_string()));

        if let Some(message) = &self.fail_delete {
            return Err(RepositoryError::Apply(message.clone()));
        }

        let key = (namespace.to_string(), name.to_string());
        if self.finalizers == Finalizers::Immediate {
            return self
                .jobs
                .lock()
                .unwrap()
                .remove(&key)
                .map(|_| Deletion::Gone)
                .ok_or_else(|| Self::not_found(namespace, name));
        }

        let uid = match self.job(namespace, name) {
            Some(job) => job
                .nested_str(&["metadata", "uid"])
                .unwrap_or(name)
                .to_string(),
            None => return Err(Self::not_found(namespace, name)),
        };
        Ok(Deletion::Terminating { uid })
    }

    async fn wait_deleted(&self, namespace: &str, name: &str, _uid: &str) -> Result<()> {
        self.record(Call::WaitDeleted(namespace.to_string(), name.to_string()));

        let key = (namespace.to_string(), name.to_string());
        if self.finalizers == Finalizers::Stuck {
            return Err(RepositoryError::Terminating {
                kind: "PipelineRun".to_string(),
                namespace: key.0,
                name: key.1,
            });
        }

        self.jobs.lock().unwrap().remove(&key);
        Ok(())
    }
}
