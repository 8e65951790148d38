mod file_config;

pub use file_config::FileConfig;

use crate::linker::LinkerSettings;
use crate::merge::DEFAULT_BATCH_SIZE;
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_TARGET_PLATFORM: char = 'C';

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub batch_size: usize,
    pub locale: Option<String>,
    pub target_platform: char,
    pub title_categories: Vec<String>,
    pub bundle_categories: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let linker = LinkerSettings::default();
        Self {
            db_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            locale: None,
            target_platform: DEFAULT_TARGET_PLATFORM,
            title_categories: linker.title_categories,
            bundle_categories: linker.bundle_categories,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub batch_size: usize,
    pub locale: Option<String>,
    pub target_platform: char,
    pub title_categories: Vec<String>,
    pub bundle_categories: Vec<String>,
    pub seed_categories: BTreeMap<String, i64>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let batch_size = file.batch_size.unwrap_or(cli.batch_size);
        if batch_size == 0 {
            bail!("batch_size must be greater than zero");
        }

        let target_platform = match file.target_platform {
            Some(s) => parse_platform(&s)?,
            None => cli.target_platform,
        };

        let locale = file.locale.or_else(|| cli.locale.clone());
        let title_categories = file
            .title_categories
            .unwrap_or_else(|| cli.title_categories.clone());
        let bundle_categories = file
            .bundle_categories
            .unwrap_or_else(|| cli.bundle_categories.clone());
        if let Some(shared) = title_categories
            .iter()
            .find(|c| bundle_categories.contains(c))
        {
            bail!("Category {:?} is both a title and a bundle category", shared);
        }

        Ok(Self {
            db_path,
            batch_size,
            locale,
            target_platform,
            title_categories,
            bundle_categories,
            seed_categories: file.categories.unwrap_or_default(),
        })
    }

    pub fn linker_settings(&self) -> LinkerSettings {
        LinkerSettings {
            title_categories: self.title_categories.clone(),
            bundle_categories: self.bundle_categories.clone(),
            target_platform: self.target_platform,
            locale: self.locale.clone(),
        }
    }
}

/// Parses a platform family marker: exactly one uppercase ASCII letter.
pub fn parse_platform(s: &str) -> Result<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Ok(c),
        _ => bail!("Invalid target platform {:?}, expected one uppercase letter", s),
    }
}
