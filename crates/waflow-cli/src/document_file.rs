use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use waflow_core::FlowDocument;

pub fn load(path: &Path) -> Result<FlowDocument> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a flow document", path.display()))
}

pub fn save(path: &Path, document: &FlowDocument) -> Result<()> {
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Writes a fresh single-screen document; refuses to clobber unless `force`.
pub fn create(path: &Path, force: bool) -> Result<FlowDocument> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let document = FlowDocument::new();
    save(path, &document)?;
    Ok(document)
}
