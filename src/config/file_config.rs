use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub batch_size: Option<usize>,
    pub locale: Option<String>,
    pub target_platform: Option<String>,

    // Root policies
    pub title_categories: Option<Vec<String>>,
    pub bundle_categories: Option<Vec<String>>,

    /// Category name -> id, inserted into the registry when absent.
    pub categories: Option<BTreeMap<String, i64>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
