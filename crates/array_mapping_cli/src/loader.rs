use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use array_mapping::MappingSpec;
use serde_json::Value as JsonValue;
use tracing::debug;

const MAPPING_KEY: &str = "mapping";

/// Loads a YAML mapping file.
///
/// The rules may sit at the top level or under a single `mapping:` key.
/// A lone top-level `mapping` entry is only unwrapped when it holds a
/// sequence or a map of maps; anything else is read as a rule named
/// `mapping`.
pub fn load_spec(path: &Path) -> Result<MappingSpec> {
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("failed to read spec {}", path.display()))?;
    let spec = parse_spec(&yaml).with_context(|| format!("failed to parse spec {}", path.display()))?;
    debug!(path = %path.display(), rules = spec.len(), "loaded mapping spec");
    Ok(spec)
}

pub fn parse_spec(yaml: &str) -> Result<MappingSpec> {
    let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let rules = match document {
        serde_yaml::Value::Mapping(mut map) if is_wrapped(&map) => map
            .remove(MAPPING_KEY)
            .unwrap_or(serde_yaml::Value::Null),
        other => other,
    };
    Ok(serde_yaml::from_value(rules)?)
}

fn is_wrapped(map: &serde_yaml::Mapping) -> bool {
    if map.len() != 1 {
        return false;
    }
    match map.get(MAPPING_KEY) {
        Some(serde_yaml::Value::Mapping(inner)) => {
            inner.values().all(serde_yaml::Value::is_mapping)
        }
        Some(serde_yaml::Value::Sequence(_)) => true,
        _ => false,
    }
}

/// Reads an input document: YAML for `.yaml`/`.yml` files, JSON otherwise.
pub fn load_input(path: &Path) -> Result<JsonValue> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read input {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let value = if is_yaml {
        serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse input YAML {}", path.display()))?
    } else {
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse input JSON {}", path.display()))?
    };
    debug!(path = %path.display(), yaml = is_yaml, "loaded input");
    Ok(value)
}

pub fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output directory {}", parent.display()))?;
        }
    }
    fs::write(path, text.as_bytes())
        .with_context(|| format!("failed to write output {}", path.display()))?;
    debug!(path = %path.display(), bytes = text.len(), "wrote output");
    Ok(())
}
