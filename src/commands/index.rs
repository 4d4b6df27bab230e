//! Index and index-page command implementations

use crate::config::Config;
use crate::error::{IndexingFailure, Result};
use crate::indexer::{IndexingReport, PageReport, SiteIndexer};
use std::sync::Arc;
use tracing::{info, warn};

/// Crawl and index every configured site. Ctrl-C stops the run.
pub async fn cmd_index(indexer: Arc<SiteIndexer>, config: &Config) -> Result<IndexingReport> {
    info!(sites = config.sites.len(), "Starting indexing");

    let stopper = indexer.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping indexing");
            if let Err(e) = stopper.stop_indexing() {
                warn!("Could not stop indexing: {}", e);
            }
        }
    });

    let result = indexer.start_indexing(&config.sites).await;
    interrupt.abort();
    result
}

/// Re-index a single page of a configured site
pub async fn cmd_index_page(
    indexer: &SiteIndexer,
    config: &Config,
    url: &str,
) -> Result<PageReport> {
    info!(url, "Re-indexing page");
    indexer.index_page(url, &config.sites).await
}

pub fn print_index_report(report: &IndexingReport) {
    println!("✓ Indexing finished (run {})\n", report.run_id);
    for site in &report.sites {
        println!("  {} ({})", site.name, site.url);
        println!(
            "    pages indexed: {}, pages failed: {}",
            site.pages_indexed, site.pages_failed
        );
    }
}

pub fn print_indexing_failure(failure: &IndexingFailure) {
    eprintln!("✗ Some sites failed indexing:\n");
    for site in &failure.failed {
        eprintln!("  {}", site.url);
        eprintln!("    {}", site.cause);
    }
    if failure.indexed.is_empty() {
        eprintln!("\nNo sites have been indexed");
    } else {
        eprintln!("\nIndexed:");
        for url in &failure.indexed {
            eprintln!("  {}", url);
        }
    }
}

pub fn print_page_report(report: &PageReport) {
    let action = if report.replaced { "Re-indexed" } else { "Indexed" };
    println!("✓ {} {} on {}", action, report.path, report.site);
    println!("  {} distinct lemmas", report.lemmas);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::lemma::LemmaExtractor;
    use crate::morph::SnowballMorphology;
    use crate::store::{IndexStore, SiteStatus, SqliteStore};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn html(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html"),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_index_command_indexes_configured_sites() {
        let server = MockServer::start().await;
        html(
            &server,
            "/",
            r#"<html><body><p>Home of leopards</p><ul><li><a href="/about">About</a></li></ul></body></html>"#,
        )
        .await;
        html(&server, "/about", "<p>About the leopards</p>").await;

        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(&tmp.path().join("test.db")).await.unwrap();
        store.init_schema().await.unwrap();
        let store = Arc::new(store);

        let mut config = Config::default();
        config.sites.push(SiteConfig::new(server.uri(), "Mock"));
        let extractor = LemmaExtractor::new(Arc::new(SnowballMorphology::new()));
        let indexer =
            Arc::new(SiteIndexer::from_config(&config, store.clone(), extractor).unwrap());

        let report = cmd_index(indexer.clone(), &config).await.unwrap();
        assert_eq!(report.sites.len(), 1);
        assert_eq!(report.sites[0].pages_indexed, 2);
        assert!(!indexer.is_running());

        let site = store
            .find_site_by_url(&format!("{}/", server.uri()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(site.get_status().unwrap(), SiteStatus::Indexed);

        let page = cmd_index_page(&indexer, &config, &format!("{}/about", server.uri()))
            .await
            .unwrap();
        assert!(page.replaced);
        assert_eq!(page.path, "/about");
    }
}
