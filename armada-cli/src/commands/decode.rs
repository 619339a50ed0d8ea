//! Decode command handler

use anyhow::{Context, Result};
use armada_core::{DispatchEvent, decode as decode_event};
use colored::*;

/// Target namespace and YAML descriptor carried by an event
pub fn render(event: &DispatchEvent) -> Result<(String, String)> {
    let (job, namespace) = decode_event(event).context("Failed to decode event payload")?;
    let yaml = serde_yaml::to_string(job.tree()).context("Failed to render job as YAML")?;
    Ok((namespace, yaml))
}

/// Print the job carried by the dispatch event in `path`
pub fn decode(path: &str) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path))?;
    let event: DispatchEvent = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a dispatch event", path))?;

    let (namespace, yaml) = render(&event)?;

    println!("  Event:     {}", event.id.cyan());
    println!("  Type:      {}", event.event_type.dimmed());
    println!(
        "  Namespace: {}",
        if namespace.is_empty() {
            "<minion default>".dimmed().to_string()
        } else {
            namespace.bold().to_string()
        }
    );
    println!();
    print!("{}", yaml);

    Ok(())
}
