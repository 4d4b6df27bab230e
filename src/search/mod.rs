//! Search ranking and snippets
//!
//! Query lemmas are resolved per site against stored frequencies. A page
//! matches when it is indexed under every resolved lemma of its site, and is
//! scored by the summed ranks of the query lemmas, normalized by the best
//! score in the result set.

mod snippet;

pub use snippet::SnippetBuilder;

use crate::config::{validate_site_url, SiteConfig};
use crate::error::{Error, Result};
use crate::lemma::LemmaExtractor;
use crate::store::{IndexStore, Page, Site};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// A page with its relevance scores
#[derive(Debug, Clone)]
pub struct RankedPage {
    pub page: Page,
    pub site: Site,
    /// Sum of the page's ranks over the query lemmas
    pub absolute_relevance: f64,
    /// Absolute relevance divided by the best in the result set
    pub relevance: f64,
}

/// Why a search produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoResultsReason {
    /// No site in scope knows the query's lemmas
    NoLemmaResolved,
    /// Lemmas were resolved but no page carries all of them
    NoMatchingPage,
}

impl std::fmt::Display for NoResultsReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoResultsReason::NoLemmaResolved => write!(f, "No indexed site contains the query words"),
            NoResultsReason::NoMatchingPage => write!(f, "No page contains all of the query words"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Pages in descending relevance order
    Found(Vec<RankedPage>),
    NoResults(NoResultsReason),
}

/// Lemma ids of one site for the current query
struct ResolvedSite {
    site: Site,
    /// Lemmas used for matching (rarity filter applied)
    matching: Vec<i64>,
    /// All query lemmas known to the site (used for scoring)
    scoring: Vec<i64>,
}

/// Ranks stored pages against a free-text query
pub struct Ranker {
    store: Arc<dyn IndexStore>,
    extractor: LemmaExtractor,
    rarity_threshold: i64,
}

impl Ranker {
    pub fn new(store: Arc<dyn IndexStore>, extractor: LemmaExtractor, rarity_threshold: i64) -> Self {
        Self {
            store,
            extractor,
            rarity_threshold,
        }
    }

    /// Rank pages of `target` (or of every configured site) for `query`
    pub async fn rank(
        &self,
        query: &str,
        target: Option<&str>,
        sites: &[SiteConfig],
    ) -> Result<SearchOutcome> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let scope = self.scope(target, sites).await?;
        let lemmas = self.extractor.lemma_set(query);
        debug!(?lemmas, sites = scope.len(), "Ranking query");
        if lemmas.is_empty() {
            return Ok(SearchOutcome::NoResults(NoResultsReason::NoLemmaResolved));
        }

        let mut resolved = Vec::new();
        for site in scope {
            if let Some(site) = self.resolve(site, &lemmas).await? {
                resolved.push(site);
            }
        }
        if resolved.is_empty() {
            return Ok(SearchOutcome::NoResults(NoResultsReason::NoLemmaResolved));
        }

        let mut ranked = Vec::new();
        for entry in &resolved {
            let pages = self
                .store
                .pages_covering_lemmas(Some(entry.site.id), &entry.matching)
                .await?;
            for page in pages {
                let absolute_relevance = self.store.sum_ranks(page.id, &entry.scoring).await?;
                ranked.push(RankedPage {
                    page,
                    site: entry.site.clone(),
                    absolute_relevance,
                    relevance: 0.0,
                });
            }
        }

        if ranked.is_empty() {
            return Ok(SearchOutcome::NoResults(NoResultsReason::NoMatchingPage));
        }

        normalize(&mut ranked);
        Ok(SearchOutcome::Found(ranked))
    }

    /// Stored sites to search: the target alone, or every configured site
    /// that has been stored
    async fn scope(&self, target: Option<&str>, sites: &[SiteConfig]) -> Result<Vec<Site>> {
        if let Some(target) = target {
            let url = validate_site_url(target)?.to_string();
            let site = self
                .store
                .find_site_by_url(&url)
                .await?
                .ok_or(Error::SiteNotFound(url))?;
            return Ok(vec![site]);
        }

        let mut scope = Vec::new();
        for config in sites {
            let Ok(url) = validate_site_url(&config.url) else {
                continue;
            };
            if let Some(site) = self.store.find_site_by_url(url.as_str()).await? {
                scope.push(site);
            }
        }
        Ok(scope)
    }

    /// Resolve query lemmas for one site; `None` excludes the site
    async fn resolve(&self, site: Site, lemmas: &[String]) -> Result<Option<ResolvedSite>> {
        let mut matching = Vec::new();
        let mut scoring = Vec::new();

        for text in lemmas {
            let Some(lemma) = self.store.find_lemma(site.id, text).await? else {
                // A missing lemma can never be matched under AND semantics
                debug!(site = %site.url, lemma = %text, "Lemma not on site");
                return Ok(None);
            };
            scoring.push(lemma.id);
            if lemma.frequency > self.rarity_threshold {
                debug!(site = %site.url, lemma = %text, frequency = lemma.frequency, "Dropping common lemma");
                continue;
            }
            matching.push(lemma.id);
        }

        if matching.is_empty() {
            return Ok(None);
        }
        Ok(Some(ResolvedSite {
            site,
            matching,
            scoring,
        }))
    }
}

/// Divide every score by the maximum and sort descending, keeping
/// encounter order among equal scores
fn normalize(ranked: &mut [RankedPage]) {
    let max = ranked
        .iter()
        .map(|r| r.absolute_relevance)
        .fold(0.0_f64, f64::max);

    for entry in ranked.iter_mut() {
        entry.relevance = if max > 0.0 {
            entry.absolute_relevance / max
        } else {
            1.0
        };
    }

    ranked.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morph::SnowballMorphology;
    use crate::store::{NewPage, SiteStatus, SqliteStore};
    use std::collections::HashMap;
    use tempfile::TempDir;

    const SITE_URL: &str = "https://example.com/";

    struct Fixture {
        ranker: Ranker,
        store: Arc<SqliteStore>,
        sites: Vec<SiteConfig>,
        _tmp: TempDir,
    }

    async fn fixture(rarity_threshold: i64) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(&tmp.path().join("test.db")).await.unwrap();
        store.init_schema().await.unwrap();
        let store = Arc::new(store);
        let extractor = LemmaExtractor::new(Arc::new(SnowballMorphology::new()));
        let ranker = Ranker::new(store.clone(), extractor, rarity_threshold);
        Fixture {
            ranker,
            store,
            sites: vec![SiteConfig::new(SITE_URL, "Example")],
            _tmp: tmp,
        }
    }

    async fn add_page(store: &SqliteStore, site: &Site, path: &str, lemmas: &[(&str, usize)]) -> Page {
        let page = store
            .insert_page_if_absent(&NewPage {
                site_id: site.id,
                path: path.to_string(),
                code: 200,
                content: String::new(),
            })
            .await
            .unwrap()
            .unwrap();
        let map: HashMap<String, usize> = lemmas.iter().map(|(l, c)| (l.to_string(), *c)).collect();
        store.index_page(&page, &map).await.unwrap();
        page
    }

    /// Three pages: P1 {cat:1, dog:1}, P2 {dog:2, fish:1}, P3 {bird:1}
    async fn scenario(rarity_threshold: i64) -> (Fixture, Page, Page) {
        let f = fixture(rarity_threshold).await;
        let site = f
            .store
            .create_site("Example", SITE_URL, SiteStatus::Indexed)
            .await
            .unwrap();
        let p1 = add_page(&f.store, &site, "/p1", &[("cat", 1), ("dog", 1)]).await;
        let p2 = add_page(&f.store, &site, "/p2", &[("dog", 2), ("fish", 1)]).await;
        add_page(&f.store, &site, "/p3", &[("bird", 1)]).await;
        (f, p1, p2)
    }

    fn found(outcome: SearchOutcome) -> Vec<RankedPage> {
        match outcome {
            SearchOutcome::Found(pages) => pages,
            SearchOutcome::NoResults(reason) => panic!("unexpected no results: {reason}"),
        }
    }

    #[tokio::test]
    async fn test_relative_relevance_scenario() {
        let (f, p1, p2) = scenario(500_000).await;

        let ranked = found(f.ranker.rank("dog", Some(SITE_URL), &f.sites).await.unwrap());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].page.id, p2.id);
        assert_eq!(ranked[0].relevance, 1.0);
        assert_eq!(ranked[1].page.id, p1.id);
        assert_eq!(ranked[1].relevance, 0.5);
        assert_eq!(ranked[1].absolute_relevance, 1.0);

        // Same result without a target site
        let ranked = found(f.ranker.rank("dogs", None, &f.sites).await.unwrap());
        assert_eq!(ranked[0].page.id, p2.id);
    }

    #[tokio::test]
    async fn test_and_semantics() {
        let (f, p1, _p2) = scenario(500_000).await;

        let ranked = found(f.ranker.rank("cat dog", None, &f.sites).await.unwrap());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].page.id, p1.id);
        assert_eq!(ranked[0].absolute_relevance, 2.0);
        assert_eq!(ranked[0].relevance, 1.0);

        let outcome = f.ranker.rank("cat fish", None, &f.sites).await.unwrap();
        assert!(matches!(
            outcome,
            SearchOutcome::NoResults(NoResultsReason::NoMatchingPage)
        ));

        let outcome = f.ranker.rank("cat horse", None, &f.sites).await.unwrap();
        assert!(matches!(
            outcome,
            SearchOutcome::NoResults(NoResultsReason::NoLemmaResolved)
        ));
    }

    #[tokio::test]
    async fn test_sites_without_a_query_lemma_are_excluded() {
        let f = fixture(500_000).await;
        let sites = vec![
            SiteConfig::new("https://one.example/", "One"),
            SiteConfig::new("https://two.example/", "Two"),
            SiteConfig::new("https://three.example/", "Three"),
        ];
        let one = f
            .store
            .create_site("One", "https://one.example/", SiteStatus::Indexed)
            .await
            .unwrap();
        let two = f
            .store
            .create_site("Two", "https://two.example/", SiteStatus::Indexed)
            .await
            .unwrap();
        let three = f
            .store
            .create_site("Three", "https://three.example/", SiteStatus::Indexed)
            .await
            .unwrap();
        let a = add_page(&f.store, &one, "/a", &[("cat", 1), ("dog", 1)]).await;
        let b = add_page(&f.store, &two, "/b", &[("cat", 2), ("dog", 2)]).await;
        let c = add_page(&f.store, &two, "/c", &[("cat", 3), ("dog", 1)]).await;
        // Site three knows dog but not cat
        add_page(&f.store, &three, "/d", &[("dog", 9)]).await;

        let ranked = found(f.ranker.rank("cat dog", None, &sites).await.unwrap());
        let ids: Vec<i64> = ranked.iter().map(|r| r.page.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&b.id) && ids.contains(&c.id) && ids.contains(&a.id));
        assert!(ranked.iter().all(|r| r.site.id != three.id));

        // b and c tie at 4.0 and are kept in encounter order; a scores 2.0
        assert_eq!(ranked[0].page.id, b.id);
        assert_eq!(ranked[0].relevance, 1.0);
        assert_eq!(ranked[1].page.id, c.id);
        assert_eq!(ranked[1].relevance, 1.0);
        assert_eq!(ranked[2].page.id, a.id);
        assert_eq!(ranked[2].site.id, one.id);
        assert_eq!(ranked[2].relevance, 0.5);
    }

    #[tokio::test]
    async fn test_target_site_url_is_normalized() {
        let (f, _p1, p2) = scenario(500_000).await;

        let ranked = found(
            f.ranker
                .rank("dog", Some("https://EXAMPLE.com"), &f.sites)
                .await
                .unwrap(),
        );
        assert_eq!(ranked[0].page.id, p2.id);
    }

    #[tokio::test]
    async fn test_common_lemmas_are_dropped() {
        // dog is on two pages, above the threshold of one
        let (f, p1, _p2) = scenario(1).await;

        let ranked = found(f.ranker.rank("dog cat", None, &f.sites).await.unwrap());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].page.id, p1.id);
        // Scoring still counts the dropped lemma
        assert_eq!(ranked[0].absolute_relevance, 2.0);

        let outcome = f.ranker.rank("dog", None, &f.sites).await.unwrap();
        assert!(matches!(
            outcome,
            SearchOutcome::NoResults(NoResultsReason::NoLemmaResolved)
        ));
    }

    #[tokio::test]
    async fn test_query_errors() {
        let (f, _p1, _p2) = scenario(500_000).await;

        assert!(matches!(
            f.ranker.rank("  ", None, &f.sites).await,
            Err(Error::EmptyQuery)
        ));
        assert!(matches!(
            f.ranker.rank("dog", Some("https://unknown.example"), &f.sites).await,
            Err(Error::SiteNotFound(_))
        ));
        // Only function words
        assert!(matches!(
            f.ranker.rank("the and", None, &f.sites).await.unwrap(),
            SearchOutcome::NoResults(NoResultsReason::NoLemmaResolved)
        ));
    }

    #[test]
    fn test_normalize_is_stable() {
        let page = |id| Page {
            id,
            site_id: 1,
            path: format!("/{id}"),
            code: 200,
            content: String::new(),
        };
        let site = Site {
            id: 1,
            name: "Example".to_string(),
            url: SITE_URL.to_string(),
            status: "INDEXED".to_string(),
            status_time: String::new(),
            last_error: None,
        };
        let mut ranked: Vec<RankedPage> = [(1, 2.0), (2, 4.0), (3, 2.0), (4, 4.0)]
            .into_iter()
            .map(|(id, score)| RankedPage {
                page: page(id),
                site: site.clone(),
                absolute_relevance: score,
                relevance: 0.0,
            })
            .collect();

        normalize(&mut ranked);
        let order: Vec<i64> = ranked.iter().map(|r| r.page.id).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        assert_eq!(ranked[0].relevance, 1.0);
        assert_eq!(ranked[3].relevance, 0.5);
    }
}
