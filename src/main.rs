//! lemmasearch CLI entry point

use clap::{Parser, Subcommand};
use lemmasearch::{
    commands::{
        cmd_index, cmd_index_page, cmd_init, cmd_search, cmd_stats, print_index_report,
        print_indexing_failure, print_init, print_page_report, print_search_results, print_stats,
        InitOptions, SearchOptions,
    },
    config::Config,
    error::{Error, Result},
    indexer::SiteIndexer,
    lemma::LemmaExtractor,
    morph::SnowballMorphology,
    search::{Ranker, SnippetBuilder},
    store::SqliteStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lemmasearch")]
#[command(version, about = "Crawl websites into a lemma index and search them", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize lemmasearch configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Crawl and index every configured site
    Index,

    /// Re-index a single page of a configured site
    IndexPage {
        /// Absolute page URL
        url: String,
    },

    /// Search the index
    Search {
        /// The search query
        query: String,

        /// Restrict the search to one site
        #[arg(short, long)]
        site: Option<String>,

        /// Number of results to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of results (0 for all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show per-site indexing statistics
    Stats,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        let result = cmd_init(init_options(cli.config, force)).await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_init(&result);
        }
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    let store = SqliteStore::connect(&config).await?;
    store.init_schema().await?;
    let store = Arc::new(store);
    let extractor = LemmaExtractor::new(Arc::new(SnowballMorphology::new()));

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Index => {
            let indexer = Arc::new(SiteIndexer::from_config(
                &config,
                store.clone(),
                extractor.clone(),
            )?);

            match cmd_index(indexer, &config).await {
                Ok(report) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        print_index_report(&report);
                    }
                }
                Err(Error::IndexingFailed(failure)) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&failure)?);
                    } else {
                        print_indexing_failure(&failure);
                    }
                    std::process::exit(1);
                }
                Err(e) => return Err(e),
            }
        }

        Commands::IndexPage { url } => {
            let indexer = SiteIndexer::from_config(&config, store.clone(), extractor.clone())?;
            let report = cmd_index_page(&indexer, &config, &url).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_page_report(&report);
            }
        }

        Commands::Search {
            query,
            site,
            offset,
            limit,
        } => {
            let ranker = Ranker::new(
                store.clone(),
                extractor.clone(),
                config.search.rarity_threshold,
            );
            let snippets = SnippetBuilder::new(
                extractor,
                config.search.snippet_length,
                config.search.snippet_lookback,
            );
            let options = SearchOptions {
                site,
                offset,
                limit,
            };

            let response = cmd_search(&config, &ranker, &snippets, &query, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_search_results(&query, &response);
            }
        }

        Commands::Stats => {
            let stats = cmd_stats(&config, store.as_ref(), false).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
    }

    Ok(())
}

/// Base directory and config path for `init`: a `.toml` argument names the
/// file itself, anything else names the directory
fn init_options(config: Option<PathBuf>, force: bool) -> InitOptions {
    let (base_dir, config_path) = match config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path)
        }
        Some(dir) => (dir.clone(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            (base.clone(), base.join("config.toml"))
        }
    };

    InitOptions {
        base_dir,
        config_path,
        force,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'lemmasearch init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
