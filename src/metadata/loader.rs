use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::models::MetadataEnvelope;

/// Parse metadata envelopes from a single JSON object, a JSON array, or
/// JSON Lines (one object per line, blank lines ignored).
pub fn parse_metadata(content: &str) -> Result<Vec<MetadataEnvelope>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse metadata array");
    }
    let single_err = match serde_json::from_str::<MetadataEnvelope>(trimmed) {
        Ok(single) => return Ok(vec![single]),
        Err(err) => err,
    };
    // JSON Lines only if the first line is a complete JSON value by itself
    let first_line = trimmed.lines().next().unwrap_or_default();
    if serde_json::from_str::<serde_json::Value>(first_line).is_err() {
        return Err(single_err).context("Failed to parse metadata object");
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse metadata on line {}", index + 1))
        })
        .collect()
}

pub fn load_metadata_file(path: &Path) -> Result<Vec<MetadataEnvelope>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata file: {:?}", path))?;
    parse_metadata(&content).with_context(|| format!("Invalid metadata file: {:?}", path))
}

/// Load every file before anything is synced, so a bad input aborts the run
/// up front instead of halfway through.
pub fn load_metadata_files<P: AsRef<Path>>(
    paths: &[P],
) -> Result<Vec<(PathBuf, Vec<MetadataEnvelope>)>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            Ok((path.to_path_buf(), load_metadata_file(path)?))
        })
        .collect()
}
