//! Records fetched from the remote metadata source.

mod loader;
mod models;

pub use loader::{load_metadata_file, load_metadata_files, parse_metadata};
pub use models::*;
