//! Dispatch command handlers
//!
//! Reads PipelineRuns from a manifest file, sanitizes them and either sends
//! the resulting events to a minion or prints them.

use anyhow::{Context, Result};
use armada_client::{DispatchClient, EventSender};
use armada_core::{
    DispatchEvent, JobResource, ManifestRegistry, ObjectKey, encode as encode_event, sanitize,
};
use colored::*;

/// Reads every PipelineRun out of a multi-document manifest
///
/// Documents of other registered kinds are ignored; unknown kinds are logged
/// and skipped by the registry.
pub fn pipeline_runs(registry: &ManifestRegistry, text: &str) -> Vec<JobResource> {
    registry.read_documents(text).pipeline_runs
}

/// Builds one dispatch event per job
///
/// # Arguments
/// * `jobs` - Jobs read from the manifest
/// * `namespace` - Target namespace; each job's own namespace when `None`
pub fn build_events(
    jobs: &[JobResource],
    namespace: Option<&str>,
) -> Result<Vec<(ObjectKey, DispatchEvent)>> {
    jobs.iter()
        .map(|job| {
            let sanitized =
                sanitize(job).with_context(|| format!("Failed to sanitize {}", job.key()))?;
            let event = encode_event(&sanitized, namespace.unwrap_or_else(|| job.namespace()))
                .with_context(|| format!("Failed to encode {}", job.key()))?;
            Ok((job.key(), event))
        })
        .collect()
}

fn read_events(path: &str, namespace: Option<&str>) -> Result<Vec<(ObjectKey, DispatchEvent)>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest file: {}", path))?;

    let jobs = pipeline_runs(&ManifestRegistry::standard(), &text);
    if jobs.is_empty() {
        anyhow::bail!("No PipelineRun found in {}", path);
    }

    for job in &jobs {
        if !job.is_pending() {
            println!(
                "{} {} is not pending; the minion will start it immediately",
                "!".yellow().bold(),
                job.key().to_string().cyan()
            );
        }
    }

    build_events(&jobs, namespace)
}

/// Send every PipelineRun in `path` to the minion at `url`
pub async fn dispatch(path: &str, namespace: Option<&str>, url: &str) -> Result<()> {
    let events = read_events(path, namespace)?;
    let client = DispatchClient::new().context("Failed to build dispatch client")?;

    let mut failed = 0;
    for (key, event) in &events {
        match client.send(event, url).await {
            Ok(ack) => println!(
                "{} {} dispatched as {} ({} {})",
                "✓".green().bold(),
                key.to_string().cyan(),
                event.id.dimmed(),
                ack.status,
                ack.message
            ),
            Err(e) => {
                failed += 1;
                println!("{} {} failed: {}", "✗".red().bold(), key.to_string().cyan(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} dispatch(es) failed", failed, events.len());
    }

    Ok(())
}

/// Print the dispatch events for every PipelineRun in `path`
pub fn encode(path: &str, namespace: Option<&str>) -> Result<()> {
    for (_, event) in read_events(path, namespace)? {
        println!("{}", serde_json::to_string_pretty(&event)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_core::decode;

    const MANIFEST: &str = r#"
apiVersion: tekton.dev/v1
kind: Pipeline
metadata:
  name: ci
spec:
  tasks: []
---
apiVersion: tekton.dev/v1
kind: PipelineRun
metadata:
  name: build-1
  namespace: ci
  labels:
    tekton.dev/pipeline: ci
spec:
  status: PipelineRunPending
  pipelineRef:
    name: ci
---
apiVersion: tekton.dev/v1
kind: PipelineRun
metadata:
  generateName: build-
  namespace: ci
spec:
  pipelineRef:
    name: ci
"#;

    #[test]
    fn test_pipeline_runs_only() {
        let jobs = pipeline_runs(&ManifestRegistry::standard(), MANIFEST);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name(), "build-1");
    }

    #[test]
    fn test_build_events_uses_job_namespace() {
        let jobs = pipeline_runs(&ManifestRegistry::standard(), MANIFEST);

        let events = build_events(&jobs, None).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, ObjectKey::new("ci", "build-1"));
        let (job, namespace) = decode(&events[0].1).unwrap();
        assert_eq!(namespace, "ci");
        assert_eq!(job.name(), Some("build-1"));
        assert!(!job.tree().contains("status"));
    }

    #[test]
    fn test_build_events_namespace_override() {
        let jobs = pipeline_runs(&ManifestRegistry::standard(), MANIFEST);

        let events = build_events(&jobs, Some("remote")).unwrap();

        for (_, event) in &events {
            assert_eq!(decode(event).unwrap().1, "remote");
        }
        // generateName wins over any name
        assert_eq!(decode(&events[1].1).unwrap().0.name(), None);
    }

    #[test]
    fn test_manifest_without_runs() {
        let jobs = pipeline_runs(
            &ManifestRegistry::standard(),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\n",
        );
        assert!(jobs.is_empty());
    }
}
