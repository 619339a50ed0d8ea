//! Manifest registry
//!
//! Maps `apiVersion`/`kind` discriminators to parse functions. The registry is
//! built once at startup and handed to whoever needs to read manifests; there
//! is no global type table.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::domain::field_tree::FieldTree;
use crate::domain::job::{JOB_API_VERSION, JOB_KIND, JobResource};
use crate::error::{CodecError, RegistryError};

const TEKTON_API_VERSION: &str = "tekton.dev/v1";
const CORE_API_VERSION: &str = "v1";

/// A manifest recognised by the registry
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    PipelineRun(JobResource),
    Pipeline(FieldTree),
    TaskRun(FieldTree),
    Task(FieldTree),
    Secret(Secret),
    ConfigMap(ConfigMap),
}

impl Manifest {
    pub fn kind(&self) -> &'static str {
        match self {
            Manifest::PipelineRun(_) => JOB_KIND,
            Manifest::Pipeline(_) => "Pipeline",
            Manifest::TaskRun(_) => "TaskRun",
            Manifest::Task(_) => "Task",
            Manifest::Secret(_) => "Secret",
            Manifest::ConfigMap(_) => "ConfigMap",
        }
    }
}

/// Parse function registered for one discriminator
pub type ParseFn = fn(FieldTree) -> Result<Manifest, RegistryError>;

/// Closed table of recognised manifest kinds
#[derive(Debug, Clone, Default)]
pub struct ManifestRegistry {
    parsers: HashMap<(String, String), ParseFn>,
}

impl ManifestRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Tekton and core kinds the relay understands
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(JOB_API_VERSION, JOB_KIND, parse_pipeline_run);
        registry.register(TEKTON_API_VERSION, "Pipeline", |tree| {
            Ok(Manifest::Pipeline(tree))
        });
        registry.register(TEKTON_API_VERSION, "TaskRun", |tree| Ok(Manifest::TaskRun(tree)));
        registry.register(TEKTON_API_VERSION, "Task", |tree| Ok(Manifest::Task(tree)));
        registry.register(CORE_API_VERSION, "Secret", |tree| {
            typed(tree, "Secret").map(Manifest::Secret)
        });
        registry.register(CORE_API_VERSION, "ConfigMap", |tree| {
            typed(tree, "ConfigMap").map(Manifest::ConfigMap)
        });
        registry
    }

    /// Registers a parser, replacing any previous one for the same discriminator
    pub fn register(&mut self, api_version: &str, kind: &str, parse: ParseFn) {
        self.parsers
            .insert((api_version.to_string(), kind.to_string()), parse);
    }

    pub fn recognizes(&self, api_version: &str, kind: &str) -> bool {
        self.parsers
            .contains_key(&(api_version.to_string(), kind.to_string()))
    }

    /// Parses a single document according to its discriminator
    pub fn parse(&self, tree: FieldTree) -> Result<Manifest, RegistryError> {
        let api_version = tree.api_version().unwrap_or_default().to_string();
        let kind = tree.kind().unwrap_or_default().to_string();

        match self.parsers.get(&(api_version.clone(), kind.clone())) {
            Some(parse) => parse(tree),
            None => Err(RegistryError::UnknownKind { api_version, kind }),
        }
    }

    /// Reads a multi-document YAML stream
    ///
    /// Blank documents are ignored. Documents that are not objects, fail to
    /// parse, or have an unregistered kind are logged and skipped.
    pub fn read_documents(&self, text: &str) -> ManifestSet {
        let mut set = ManifestSet::default();

        for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
            let value = match Value::deserialize(document) {
                Ok(Value::Null) => continue,
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping document {} that is not valid YAML: {}", index, e);
                    continue;
                }
            };

            let Some(tree) = FieldTree::from_value(value) else {
                warn!("Skipping document {} that is not a mapping", index);
                continue;
            };

            match self.parse(tree) {
                Ok(manifest) => {
                    debug!("Read {} from document {}", manifest.kind(), index);
                    set.push(manifest);
                }
                Err(e) => warn!("Skipping document {}: {}", index, e),
            }
        }

        set
    }

    /// Reads a list of base64-encoded YAML streams
    pub fn read_encoded(&self, documents: &[String]) -> Result<ManifestSet, CodecError> {
        let mut set = ManifestSet::default();
        for encoded in documents {
            let bytes = STANDARD.decode(encoded.trim())?;
            let text = String::from_utf8(bytes)
                .map_err(|e| CodecError::PayloadDeserialize(e.to_string()))?;
            set.extend(self.read_documents(&text));
        }
        Ok(set)
    }
}

fn parse_pipeline_run(tree: FieldTree) -> Result<Manifest, RegistryError> {
    JobResource::from_value(tree.into_value())
        .map(Manifest::PipelineRun)
        .map_err(|e| RegistryError::invalid(JOB_KIND, e))
}

fn typed<T: serde::de::DeserializeOwned>(tree: FieldTree, kind: &str) -> Result<T, RegistryError> {
    serde_json::from_value(tree.into_value()).map_err(|e| RegistryError::invalid(kind, e))
}

/// Manifests read from one or more documents, grouped by kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestSet {
    pub pipeline_runs: Vec<JobResource>,
    pub pipelines: Vec<FieldTree>,
    pub task_runs: Vec<FieldTree>,
    pub tasks: Vec<FieldTree>,
    pub secrets: Vec<Secret>,
    pub config_maps: Vec<ConfigMap>,
}

impl ManifestSet {
    pub fn push(&mut self, manifest: Manifest) {
        match manifest {
            Manifest::PipelineRun(m) => self.pipeline_runs.push(m),
            Manifest::Pipeline(m) => self.pipelines.push(m),
            Manifest::TaskRun(m) => self.task_runs.push(m),
            Manifest::Task(m) => self.tasks.push(m),
            Manifest::Secret(m) => self.secrets.push(m),
            Manifest::ConfigMap(m) => self.config_maps.push(m),
        }
    }

    pub fn extend(&mut self, other: ManifestSet) {
        self.pipeline_runs.extend(other.pipeline_runs);
        self.pipelines.extend(other.pipelines);
        self.task_runs.extend(other.task_runs);
        self.tasks.extend(other.tasks);
        self.secrets.extend(other.secrets);
        self.config_maps.extend(other.config_maps);
    }

    pub fn len(&self) -> usize {
        self.pipeline_runs.len()
            + self.pipelines.len()
            + self.task_runs.len()
            + self.tasks.len()
            + self.secrets.len()
            + self.config_maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STREAM: &str = r#"
apiVersion: tekton.dev/v1
kind: PipelineRun
metadata:
  name: build-1
spec:
  pipelineRef:
    name: ci
---
---
apiVersion: tekton.dev/v1
kind: Pipeline
metadata:
  name: ci
spec:
  tasks: []
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  retries: "3"
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: ignored
---
- just
- a list
"#;

    #[test]
    fn test_read_documents_groups_by_kind() {
        let registry = ManifestRegistry::standard();
        let set = registry.read_documents(STREAM);

        assert_eq!(set.len(), 3);
        assert_eq!(set.pipeline_runs.len(), 1);
        assert_eq!(set.pipeline_runs[0].name(), "build-1");
        assert_eq!(set.pipelines.len(), 1);
        assert_eq!(set.config_maps.len(), 1);
        assert_eq!(
            set.config_maps[0].data.as_ref().unwrap().get("retries"),
            Some(&"3".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_kind() {
        let registry = ManifestRegistry::standard();
        let tree = FieldTree::from_value(json!({ "apiVersion": "apps/v1", "kind": "Deployment" }))
            .unwrap();

        let err = registry.parse(tree).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownKind { ref kind, .. } if kind == "Deployment"));
    }

    #[test]
    fn test_parse_invalid_known_kind() {
        let registry = ManifestRegistry::standard();
        let tree = FieldTree::from_value(json!({
            "apiVersion": "tekton.dev/v1",
            "kind": "PipelineRun",
            "metadata": "not-an-object"
        }))
        .unwrap();

        assert!(matches!(
            registry.parse(tree),
            Err(RegistryError::Invalid { .. })
        ));
    }

    #[test]
    fn test_empty_registry_recognizes_nothing() {
        let registry = ManifestRegistry::new();
        assert!(!registry.recognizes(JOB_API_VERSION, JOB_KIND));
        assert!(registry.read_documents(STREAM).is_empty());
        assert!(ManifestRegistry::standard().recognizes(JOB_API_VERSION, JOB_KIND));
    }

    #[test]
    fn test_read_encoded() {
        let registry = ManifestRegistry::standard();
        let docs = vec![STANDARD.encode(STREAM), STANDARD.encode("")];
        let set = registry.read_encoded(&docs).unwrap();
        assert_eq!(set.len(), 3);

        let bad = vec!["%%%".to_string()];
        assert!(matches!(
            registry.read_encoded(&bad),
            Err(CodecError::Base64(_))
        ));
    }
}
