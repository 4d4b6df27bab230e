//! Site crawling
//!
//! This module provides:
//! - Page fetching with fixed identification headers
//! - Same-site link filtering
//! - A run context carrying the stop flag and page-error budget
//! - A concurrent frontier crawl that stores and indexes each new page

mod fetch;
mod links;

pub use fetch::*;
pub use links::*;

use crate::error::{Error, Result};
use crate::lemma::LemmaExtractor;
use crate::parse::parse_html;
use crate::store::{IndexStore, NewPage, Site};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// State shared by every crawl task of one indexing run
#[derive(Debug)]
pub struct RunContext {
    id: Uuid,
    stopped: AtomicBool,
    page_errors: AtomicUsize,
    error_margin: usize,
}

impl RunContext {
    pub fn new(error_margin: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            stopped: AtomicBool::new(false),
            page_errors: AtomicUsize::new(0),
            error_margin,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cooperative cancellation of the run
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Count one failed page; errors once the run exceeds its margin
    pub fn record_page_error(&self) -> Result<usize> {
        let count = self.page_errors.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.error_margin {
            return Err(Error::TooManyPageErrors { count });
        }
        Ok(count)
    }

    pub fn page_errors(&self) -> usize {
        self.page_errors.load(Ordering::SeqCst)
    }
}

/// Counters for one site crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    pub pages_indexed: usize,
    pub pages_failed: usize,
}

/// What happened to one page task
enum PageOutcome {
    /// Stored and indexed; carries the outbound links
    Indexed(Vec<Url>),
    /// Another task already stored this path
    AlreadyStored,
    /// A cancellation checkpoint fired
    Stopped,
    /// Fetching or indexing failed for this page only
    Failed(Error),
    /// Storage failure; the site crawl cannot continue
    Fatal(Error),
}

/// Concurrent crawler for one site at a time
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn IndexStore>,
    extractor: LemmaExtractor,
    max_concurrent_fetches: usize,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn IndexStore>,
        extractor: LemmaExtractor,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            extractor,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    /// Crawl a site from its homepage until the frontier is exhausted.
    ///
    /// A homepage failure is fatal for the site. Other page failures are
    /// counted against the run's error budget. Returns `StoppedByUser` when
    /// the run was stopped; pages stored before that are kept.
    pub async fn crawl_site(&self, site: &Site, run: Arc<RunContext>) -> Result<CrawlStats> {
        let site_url = Url::parse(&site.url)?;
        let span = info_span!("crawl", run = %run.id(), site = %site.url);

        async move {
            info!("Starting crawl");

            let semaphore = Arc::new(Semaphore::new(self.max_concurrent_fetches));
            let mut visited: HashSet<String> = HashSet::new();
            let mut tasks: JoinSet<(bool, PageOutcome)> = JoinSet::new();
            let mut stats = CrawlStats::default();

            let home_path = page_path(&site_url, &site_url);
            visited.insert(home_path.clone());
            self.spawn_page(&mut tasks, &semaphore, site, &site_url, home_path, true, &run);

            while let Some(joined) = tasks.join_next().await {
                let (is_homepage, outcome) = match joined {
                    Ok(result) => result,
                    Err(e) if e.is_cancelled() => continue,
                    Err(e) => {
                        tasks.abort_all();
                        return Err(Error::Other(format!("Crawl task panicked: {}", e)));
                    }
                };

                match outcome {
                    PageOutcome::Indexed(links) => {
                        stats.pages_indexed += 1;
                        if run.is_stopped() {
                            continue;
                        }
                        for link in links {
                            if !is_crawlable_link(&site_url, &link) {
                                continue;
                            }
                            let path = page_path(&site_url, &link);
                            if !visited.insert(path.clone()) {
                                continue;
                            }
                            match self.store.page_exists(site.id, &path).await {
                                Ok(true) => continue,
                                Ok(false) => {}
                                Err(e) => {
                                    tasks.abort_all();
                                    return Err(e);
                                }
                            }
                            self.spawn_page(&mut tasks, &semaphore, site, &link, path, false, &run);
                        }
                    }
                    PageOutcome::AlreadyStored | PageOutcome::Stopped => {}
                    PageOutcome::Failed(e) if is_homepage => {
                        tasks.abort_all();
                        return Err(e);
                    }
                    PageOutcome::Failed(e) => {
                        stats.pages_failed += 1;
                        match run.record_page_error() {
                            Ok(count) => warn!(error = %e, errors = count, "Page failed"),
                            Err(too_many) => {
                                tasks.abort_all();
                                return Err(too_many);
                            }
                        }
                    }
                    PageOutcome::Fatal(e) => {
                        tasks.abort_all();
                        return Err(e);
                    }
                }
            }

            if run.is_stopped() {
                info!(pages = stats.pages_indexed, "Crawl stopped");
                return Err(Error::StoppedByUser);
            }

            info!(
                pages = stats.pages_indexed,
                failed = stats.pages_failed,
                "Crawl finished"
            );
            Ok(stats)
        }
        .instrument(span)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_page(
        &self,
        tasks: &mut JoinSet<(bool, PageOutcome)>,
        semaphore: &Arc<Semaphore>,
        site: &Site,
        url: &Url,
        path: String,
        is_homepage: bool,
        run: &Arc<RunContext>,
    ) {
        let crawler = self.clone();
        let semaphore = semaphore.clone();
        let run = run.clone();
        let site_id = site.id;
        let url = url.clone();
        let span = info_span!("page", page = %path);

        tasks.spawn(
            async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (is_homepage, PageOutcome::Stopped);
                };
                let outcome = crawler.process_page(site_id, &url, path, &run).await;
                (is_homepage, outcome)
            }
            .instrument(span),
        );
    }

    async fn process_page(
        &self,
        site_id: i64,
        url: &Url,
        path: String,
        run: &RunContext,
    ) -> PageOutcome {
        if run.is_stopped() {
            return PageOutcome::Stopped;
        }

        let fetched = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => return PageOutcome::Failed(e),
        };

        if run.is_stopped() {
            return PageOutcome::Stopped;
        }

        let new_page = NewPage {
            site_id,
            path,
            code: i64::from(fetched.status),
            content: fetched.html,
        };
        let page = match self.store.insert_page_if_absent(&new_page).await {
            Ok(Some(page)) => page,
            Ok(None) => return PageOutcome::AlreadyStored,
            Err(e) => return PageOutcome::Fatal(e),
        };
        if let Err(e) = self.store.touch_site(site_id).await {
            return PageOutcome::Fatal(e);
        }

        if run.is_stopped() {
            return PageOutcome::Stopped;
        }

        let parsed = parse_html(&page.content, url);
        let lemmas = self.extractor.collect_lemmas(&parsed.text);

        if let Err(e) = self.store.index_page(&page, &lemmas).await {
            warn!(error = %e, "Indexing failed, removing page");
            if let Err(remove_err) = self.store.remove_page(page.id).await {
                return PageOutcome::Fatal(remove_err);
            }
            return PageOutcome::Failed(e);
        }
        debug!(lemmas = lemmas.len(), "Page indexed");

        if run.is_stopped() {
            return PageOutcome::Stopped;
        }

        PageOutcome::Indexed(parsed.links)
    }
}
