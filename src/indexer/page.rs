//! Single-page re-indexing

use super::SiteIndexer;
use crate::config::{clean_url_input, find_site_for_url, validate_site_url, SiteConfig};
use crate::crawl::page_path;
use crate::error::{Error, Result};
use crate::store::{NewPage, SiteStatus};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

/// Result of re-indexing one page
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub site: String,
    pub path: String,
    pub lemmas: usize,
    /// Whether a previous version of the page was replaced
    pub replaced: bool,
}

impl SiteIndexer {
    /// Fetch one page of a configured site and replace its stored version.
    ///
    /// The old page's index entries are removed (decrementing lemma
    /// frequencies) before the new version is indexed, so repeating the call
    /// leaves exactly one page and no stale entries.
    pub async fn index_page(&self, raw_url: &str, sites: &[SiteConfig]) -> Result<PageReport> {
        let cleaned = clean_url_input(raw_url);
        let url = Url::parse(&cleaned).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw_url, e)))?;

        let config = find_site_for_url(sites, &url)
            .ok_or_else(|| Error::OutsideConfiguredSites(url.to_string()))?;
        let site_url = validate_site_url(&config.url)?;

        let site = match self.store.find_site_by_url(site_url.as_str()).await? {
            Some(site) => site,
            None => {
                self.store
                    .create_site(&config.name, site_url.as_str(), SiteStatus::Indexed)
                    .await?
            }
        };

        let fetched = self.crawler.fetcher().fetch(&url).await?;
        let path = page_path(&site_url, &url);

        let replaced = match self.store.find_page(site.id, &path).await? {
            Some(old) => self.store.remove_page(old.id).await?,
            None => false,
        };

        let page = self
            .store
            .insert_page_if_absent(&NewPage {
                site_id: site.id,
                path: path.clone(),
                code: i64::from(fetched.status),
                content: fetched.html,
            })
            .await?
            .ok_or_else(|| Error::Other(format!("Page {} was stored concurrently", url)))?;

        let lemmas = self.extractor.lemmas_from_html(&page.content);
        if let Err(e) = self.store.index_page(&page, &lemmas).await {
            warn!(page = %path, error = %e, "Indexing failed, removing page");
            self.store.remove_page(page.id).await?;
            return Err(e);
        }
        self.store.touch_site(site.id).await?;

        info!(site = %site.url, page = %path, lemmas = lemmas.len(), replaced, "Page indexed");
        Ok(PageReport {
            site: site.url,
            path,
            lemmas: lemmas.len(),
            replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, SiteConfig};
    use crate::error::Error;
    use crate::indexer::SiteIndexer;
    use crate::lemma::LemmaExtractor;
    use crate::morph::SnowballMorphology;
    use crate::parse::visible_text;
    use crate::store::{IndexStore, SiteStatus, SqliteStore};
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (SiteIndexer, Arc<SqliteStore>, LemmaExtractor, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(&tmp.path().join("test.db")).await.unwrap();
        store.init_schema().await.unwrap();
        let store = Arc::new(store);
        let extractor = LemmaExtractor::new(Arc::new(SnowballMorphology::new()));
        let indexer =
            SiteIndexer::from_config(&Config::default(), store.clone(), extractor.clone()).unwrap();
        (indexer, store, extractor, tmp)
    }

    async fn serve(server: &MockServer, route: &str, html: &str) {
        server.reset().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(html.as_bytes().to_vec(), "text/html"),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_reindex_is_idempotent_and_drops_stale_lemmas() {
        let server = MockServer::start().await;
        let (indexer, store, extractor, _tmp) = setup().await;
        let sites = vec![SiteConfig::new(server.uri(), "Mock")];
        let page_url = format!("{}/article", server.uri());

        serve(&server, "/article", "<p>dogs chase cats</p>").await;
        let first = indexer.index_page(&page_url, &sites).await.unwrap();
        assert!(!first.replaced);
        let report = indexer.index_page(&page_url, &sites).await.unwrap();
        assert!(report.replaced);

        let site = store
            .find_site_by_url(&format!("{}/", server.uri()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(site.get_status().unwrap(), SiteStatus::Indexed);
        assert_eq!(store.count_pages(Some(site.id)).await.unwrap(), 1);
        let cat = store.find_lemma(site.id, "cat").await.unwrap().unwrap();
        assert_eq!(cat.frequency, 1);

        // New content: stale lemmas disappear, ranks match a fresh extraction
        let html = "<p>fish and more fish</p>";
        serve(&server, "/article", html).await;
        indexer.index_page(&page_url, &sites).await.unwrap();

        assert_eq!(store.count_pages(Some(site.id)).await.unwrap(), 1);
        assert!(store.find_lemma(site.id, "cat").await.unwrap().is_none());
        let page = store.find_page(site.id, "/article").await.unwrap().unwrap();
        let ranks = store.page_lemma_ranks(page.id).await.unwrap();
        let expected = extractor.collect_lemmas(&visible_text(html));
        assert_eq!(ranks.len(), expected.len());
        for (lemma, count) in expected {
            assert_eq!(ranks.get(&lemma), Some(&(count as f64)));
        }
    }

    #[tokio::test]
    async fn test_reindex_rejects_foreign_urls() {
        let (indexer, _store, _extractor, _tmp) = setup().await;
        let sites = vec![SiteConfig::new("https://example.com", "Example")];

        let err = indexer
            .index_page("https://elsewhere.org/page", &sites)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OutsideConfiguredSites(_)));
    }

    #[tokio::test]
    async fn test_reindex_fetch_failure_keeps_old_page() {
        let server = MockServer::start().await;
        let (indexer, store, _extractor, _tmp) = setup().await;
        let sites = vec![SiteConfig::new(server.uri(), "Mock")];
        let page_url = format!("{}/article", server.uri());

        serve(&server, "/article", "<p>dogs</p>").await;
        indexer.index_page(&page_url, &sites).await.unwrap();

        server.reset().await;
        let err = indexer.index_page(&page_url, &sites).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        assert_eq!(store.count_pages(None).await.unwrap(), 1);
    }
}
