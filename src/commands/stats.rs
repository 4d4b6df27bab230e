//! Stats command implementation

use crate::config::{validate_site_url, Config};
use crate::error::Result;
use crate::store::IndexStore;
use serde::Serialize;
use tracing::info;

/// Status reported for configured sites that were never indexed
pub const NOT_INDEXED: &str = "NOT_INDEXED";

/// Statistics for one configured site
#[derive(Debug, Clone, Serialize)]
pub struct SiteStatistics {
    pub name: String,
    pub url: String,
    pub status: String,
    pub status_time: Option<String>,
    pub error: Option<String>,
    pub pages: i64,
    pub lemmas: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: i64,
    pub lemmas: i64,
    pub indexing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// Collect per-site and total statistics for the configured sites
pub async fn cmd_stats(
    config: &Config,
    store: &dyn IndexStore,
    indexing: bool,
) -> Result<Statistics> {
    info!("Collecting statistics");

    let mut detailed = Vec::with_capacity(config.sites.len());
    for site_config in &config.sites {
        let stored = match validate_site_url(&site_config.url) {
            Ok(url) => store.find_site_by_url(url.as_str()).await?,
            Err(_) => store.find_site_by_url(&site_config.url).await?,
        };

        let stats = match stored {
            Some(site) => SiteStatistics {
                name: site.name,
                url: site.url,
                status: site.status,
                status_time: Some(site.status_time),
                error: site.last_error,
                pages: store.count_pages(Some(site.id)).await?,
                lemmas: store.count_lemmas(Some(site.id)).await?,
            },
            None => SiteStatistics {
                name: site_config.name.clone(),
                url: site_config.url.clone(),
                status: NOT_INDEXED.to_string(),
                status_time: None,
                error: None,
                pages: 0,
                lemmas: 0,
            },
        };
        detailed.push(stats);
    }

    let total = TotalStatistics {
        sites: detailed.len(),
        pages: detailed.iter().map(|s| s.pages).sum(),
        lemmas: detailed.iter().map(|s| s.lemmas).sum(),
        indexing,
    };

    Ok(Statistics { total, detailed })
}

pub fn print_stats(stats: &Statistics) {
    println!("📊 lemmasearch statistics\n");
    println!("Sites:    {}", stats.total.sites);
    println!("Pages:    {}", stats.total.pages);
    println!("Lemmas:   {}", stats.total.lemmas);
    println!(
        "Indexing: {}",
        if stats.total.indexing { "running" } else { "idle" }
    );

    for site in &stats.detailed {
        println!("\n{} ({})", site.name, site.url);
        match &site.status_time {
            Some(time) => println!("  Status: {} since {}", site.status, time),
            None => println!("  Status: {}", site.status),
        }
        println!("  Pages: {}, lemmas: {}", site.pages, site.lemmas);
        if let Some(error) = &site.error {
            println!("  Last error: {}", error);
        }
    }
}
