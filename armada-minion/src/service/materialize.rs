//! Materialize Service
//!
//! Re-creates a dispatched job in the local cluster. An existing job with the
//! same name is deleted first, and its finalizers are waited on, before the
//! create; nothing is merged. Two deliveries for the same name racing each
//! other are not serialized and the last create wins.

use armada_core::domain::field_tree::FieldTypeError;
use armada_core::domain::job::{JOB_API_VERSION, JOB_KIND};
use armada_core::{Manifest, ManifestRegistry, RegistryError, SanitizedJob};
use thiserror::Error;

use crate::repository::job_repository::{Deletion, JobRepository, RepositoryError};

/// Service error type
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Invalid(#[from] RegistryError),

    #[error("descriptor is a {0}, expected a PipelineRun")]
    WrongKind(&'static str),

    #[error("failed to stamp descriptor: {0}")]
    Stamp(#[from] FieldTypeError),

    #[error("failed to replace existing job: {0}")]
    Delete(#[source] RepositoryError),

    #[error("failed to create job: {0}")]
    Create(#[source] RepositoryError),
}

/// A job created in the local cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub namespace: String,
    /// Name assigned by the cluster, which may differ from the template's when
    /// it only carries `generateName`
    pub name: String,
    /// Whether an existing job of the same name was deleted first
    pub replaced: bool,
}

/// Creates `job` in `namespace`, replacing any job of the same name
///
/// # Arguments
/// * `repository` - Cluster access
/// * `registry` - Used to check the stamped descriptor is a well-formed job
/// * `job` - Descriptor decoded from the dispatch event
/// * `namespace` - Target namespace
pub async fn materialize(
    repository: &dyn JobRepository,
    registry: &ManifestRegistry,
    job: SanitizedJob,
    namespace: &str,
) -> Result<Materialized, MaterializeError> {
    let mut tree = job.into_tree();
    tree.set_type_meta(JOB_API_VERSION, JOB_KIND);
    tree.set_namespace(namespace)?;

    match registry.parse(tree.clone())? {
        Manifest::PipelineRun(_) => {}
        other => return Err(MaterializeError::WrongKind(other.kind())),
    }

    let mut replaced = false;
    if let Some(name) = tree.name() {
        match repository.get(namespace, name).await {
            Ok(_) => {
                tracing::info!("{} {}/{} exists, deleting it first", JOB_KIND, namespace, name);
                match repository.delete(namespace, name).await {
                    Ok(Deletion::Gone) => replaced = true,
                    Ok(Deletion::Terminating { uid }) => {
                        tracing::info!(
                            "Waiting for {} {}/{} to finish terminating",
                            JOB_KIND,
                            namespace,
                            name
                        );
                        repository
                            .wait_deleted(namespace, name, &uid)
                            .await
                            .map_err(MaterializeError::Delete)?;
                        replaced = true;
                    }
                    // already gone between get and delete
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(MaterializeError::Delete(e)),
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(MaterializeError::Delete(e)),
        }
    }

    let created = repository
        .create(namespace, &tree)
        .await
        .map_err(MaterializeError::Create)?;
    let name = created.name().unwrap_or_default().to_string();

    tracing::info!("Created {} {}/{}", JOB_KIND, namespace, name);

    Ok(Materialized {
        namespace: namespace.to_string(),
        name,
        replaced,
    })
}
