use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_sync::config::{parse_platform, AppConfig, CliConfig, FileConfig};
use catalog_sync::merge::DEFAULT_BATCH_SIZE;
use catalog_sync::metadata::load_metadata_files;
use catalog_sync::{metrics, CatalogSync, SqliteRecordStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(about = "Merge remote catalog metadata into the local catalog database")]
struct CliArgs {
    /// Metadata files to sync: a JSON envelope, an array of envelopes, or JSON Lines.
    #[clap(value_parser = parse_path, required = true)]
    pub inputs: Vec<PathBuf>,

    /// Path to the SQLite catalog database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Optional TOML config file, its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Upserts between automatic commits.
    #[clap(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Locale of the metadata, stored as the comment of primary titles.
    #[clap(long)]
    pub locale: Option<String>,

    /// Platform family marker of the bundle entitlements to keep.
    #[clap(long, default_value = "C", value_parser = parse_platform)]
    pub target_platform: char,

    /// Remote categories handled as primary titles.
    #[clap(long, value_delimiter = ',', default_value = "downloadable_game")]
    pub title_categories: Vec<String>,

    /// Remote categories handled as bundles.
    #[clap(long, value_delimiter = ',', default_value = "bundle")]
    pub bundle_categories: Vec<String>,

    /// Print the collected metrics in Prometheus text format on exit.
    #[clap(long)]
    pub print_metrics: bool,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        batch_size: cli_args.batch_size,
        locale: cli_args.locale.clone(),
        target_platform: cli_args.target_platform,
        title_categories: cli_args.title_categories.clone(),
        bundle_categories: cli_args.bundle_categories.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    // Every input is parsed before the database is touched
    let inputs = load_metadata_files(&cli_args.inputs)?;

    metrics::init_metrics();

    info!("Opening SQLite catalog database at {:?}...", config.db_path);
    let store = SqliteRecordStore::new(&config.db_path)?;

    let seeded = store.seed_categories(
        config
            .seed_categories
            .iter()
            .map(|(name, id)| (name.as_str(), *id)),
    )?;
    if seeded > 0 {
        info!("Added {} categories to the registry", seeded);
    }

    let flags = Arc::new(store.load_flag_registry()?);
    let categories = Arc::new(store.load_category_registry()?);
    info!(
        "Loaded {} flags and {} categories",
        flags.len(),
        categories.len()
    );

    let mut sync = CatalogSync::new(
        store,
        flags,
        categories,
        config.linker_settings(),
        config.batch_size,
    );
    for (input, envelopes) in &inputs {
        info!("Syncing {} records from {:?}", envelopes.len(), input);
        sync.sync_all(envelopes)?;
    }

    let stats = sync.finish()?;
    if stats.failed > 0 {
        info!("{} records could not be synced, see errors above", stats.failed);
    }

    if cli_args.print_metrics {
        print!("{}", metrics::render());
    }
    Ok(())
}
