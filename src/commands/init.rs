//! Init command implementation

use crate::config::{Config, SiteConfig};
use crate::error::{Error, Result};
use crate::store::SqliteStore;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

/// What `init` created
#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    pub config_path: String,
    pub db_path: String,
}

/// Write a starter configuration and create the database schema
pub async fn cmd_init(options: InitOptions) -> Result<InitResult> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.init_paths(Some(base_dir));
    config.paths.config_file = config_path;
    config
        .sites
        .push(SiteConfig::new("https://example.com/", "Example"));
    config.validate()?;
    config.save()?;

    let store = SqliteStore::connect(&config).await?;
    store.init_schema().await?;
    info!("Created database at {:?}", config.paths.db_file);

    Ok(InitResult {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
    })
}

pub fn print_init(result: &InitResult) {
    println!("✓ lemmasearch initialized successfully");
    println!("  Config:   {}", result.config_path);
    println!("  Database: {}", result.db_path);
    println!("\nNext steps:");
    println!("  1. Edit the [[sites]] entries in the config file");
    println!("  2. Crawl and index them: lemmasearch index");
    println!("  3. Search: lemmasearch search \"your query\"");
}
