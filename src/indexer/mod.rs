//! Site indexing orchestration
//!
//! Drives every configured site through QUEUED -> INDEXING -> INDEXED/FAILED,
//! one site at a time, and owns the run's stop flag.

mod page;

pub use page::PageReport;

use crate::config::{validate_site_url, Config, SiteConfig};
use crate::crawl::{Crawler, HttpFetcher, RunContext};
use crate::error::{
    Error, FailureCause, FailureKind, IndexingFailure, Result, SiteFailure,
};
use crate::lemma::LemmaExtractor;
use crate::store::{IndexStore, Site, SiteStatus};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::AbortHandle;
use tracing::{error, info, info_span, warn, Instrument};

/// Summary of one successfully indexed site
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub name: String,
    pub url: String,
    pub pages_indexed: usize,
    pub pages_failed: usize,
}

/// Summary of a run in which every site reached INDEXED
#[derive(Debug, Clone, Serialize)]
pub struct IndexingReport {
    pub run_id: String,
    pub sites: Vec<SiteReport>,
}

#[derive(Default)]
struct IndexerState {
    run: Option<Arc<RunContext>>,
    running_sites: Vec<String>,
    current: Option<AbortHandle>,
}

/// Site indexing orchestrator
pub struct SiteIndexer {
    store: Arc<dyn IndexStore>,
    crawler: Crawler,
    extractor: LemmaExtractor,
    page_error_margin: usize,
    state: Mutex<IndexerState>,
}

impl SiteIndexer {
    pub fn new(
        store: Arc<dyn IndexStore>,
        crawler: Crawler,
        extractor: LemmaExtractor,
        page_error_margin: usize,
    ) -> Self {
        Self {
            store,
            crawler,
            extractor,
            page_error_margin,
            state: Mutex::new(IndexerState::default()),
        }
    }

    /// Build an indexer with an HTTP fetcher configured from `[crawl]`
    pub fn from_config(
        config: &Config,
        store: Arc<dyn IndexStore>,
        extractor: LemmaExtractor,
    ) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.crawl)?);
        let crawler = Crawler::new(
            fetcher,
            store.clone(),
            extractor.clone(),
            config.crawl.max_concurrent_fetches,
        );
        Ok(Self::new(
            store,
            crawler,
            extractor,
            config.crawl.page_error_margin,
        ))
    }

    fn state(&self) -> MutexGuard<'_, IndexerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.state().run.is_some()
    }

    /// URLs of the sites belonging to the active run
    pub fn running_sites(&self) -> Vec<String> {
        self.state().running_sites.clone()
    }

    /// Index every configured site, sequentially.
    ///
    /// Per-site failures are collected and reported together as
    /// `IndexingFailed` once all sites have been attempted. Exceeding the
    /// page-error budget aborts the rest of the run with `TooManyPageErrors`.
    pub async fn start_indexing(&self, sites: &[SiteConfig]) -> Result<IndexingReport> {
        let run = {
            let mut state = self.state();
            if state.run.is_some() {
                return Err(Error::IndexingAlreadyRunning);
            }
            let run = Arc::new(RunContext::new(self.page_error_margin));
            state.run = Some(run.clone());
            state.running_sites = sites.iter().map(|s| s.url.clone()).collect();
            run
        };

        let span = info_span!("indexing", run = %run.id());
        let result = self.run_sites(sites, &run).instrument(span).await;

        let mut state = self.state();
        state.run = None;
        state.running_sites.clear();
        state.current = None;
        result
    }

    /// Stop the active run: cancel the current site's crawl and fail the rest
    pub fn stop_indexing(&self) -> Result<()> {
        let mut state = self.state();
        let Some(run) = state.run.clone() else {
            return Err(Error::IndexingNotRunning);
        };

        run.stop();
        if let Some(handle) = state.current.take() {
            handle.abort();
        }
        state.running_sites.clear();
        info!(run = %run.id(), "Indexing stop requested");
        Ok(())
    }

    async fn run_sites(
        &self,
        sites: &[SiteConfig],
        run: &Arc<RunContext>,
    ) -> Result<IndexingReport> {
        let mut failed: Vec<SiteFailure> = Vec::new();
        let mut indexed: Vec<String> = Vec::new();
        let mut reports = Vec::new();

        let queued = self.prepare_sites(sites, &mut failed).await;
        info!(sites = queued.len(), "Indexing started");

        for (position, site) in queued.iter().enumerate() {
            if run.is_stopped() {
                self.fail_site(site, FailureCause::stopped_by_user(), &mut failed)
                    .await;
                continue;
            }

            match self.index_site(site, run).await {
                Ok(report) => {
                    indexed.push(site.url.clone());
                    reports.push(report);
                }
                Err(Error::TooManyPageErrors { count }) => {
                    error!(site = %site.url, errors = count, "Too many page errors, aborting run");
                    let cause = Error::TooManyPageErrors { count }.to_cause();
                    for remaining in &queued[position..] {
                        if let Err(e) = self.mark_failed(remaining, &cause).await {
                            error!(site = %remaining.url, error = %e, "Could not record site failure");
                        }
                    }
                    return Err(Error::TooManyPageErrors { count });
                }
                Err(e) => {
                    let cause = e.to_cause();
                    warn!(site = %site.url, cause = %cause, "Site failed");
                    self.fail_site(site, cause, &mut failed).await;
                }
            }
        }

        if !failed.is_empty() {
            return Err(Error::IndexingFailed(IndexingFailure { failed, indexed }));
        }

        info!(sites = reports.len(), "Indexing finished");
        Ok(IndexingReport {
            run_id: run.id().to_string(),
            sites: reports,
        })
    }

    /// Replace stored data of every configured site with a fresh QUEUED record.
    /// Sites with a malformed URL are recorded as FAILED and skipped, as are
    /// sites whose record cannot be written.
    async fn prepare_sites(&self, sites: &[SiteConfig], failed: &mut Vec<SiteFailure>) -> Vec<Site> {
        let mut queued = Vec::with_capacity(sites.len());

        for config in sites {
            let result = match validate_site_url(&config.url) {
                Ok(url) => self.replace_site(&config.name, url.as_str()).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(site) => queued.push(site),
                Err(e @ Error::InvalidUrl(_)) => {
                    let cause = e.to_cause();
                    warn!(site = %config.url, cause = %cause, "Invalid site URL");
                    match self.replace_site(&config.name, &config.url).await {
                        Ok(site) => self.fail_site(&site, cause, failed).await,
                        Err(e) => {
                            error!(site = %config.url, error = %e, "Could not record site failure");
                            failed.push(SiteFailure {
                                url: config.url.clone(),
                                cause,
                            });
                        }
                    }
                }
                Err(e) => {
                    error!(site = %config.url, error = %e, "Could not queue site");
                    failed.push(SiteFailure {
                        url: config.url.clone(),
                        cause: e.to_cause(),
                    });
                }
            }
        }

        queued
    }

    /// Drop everything stored under `url` and create a QUEUED record
    async fn replace_site(&self, name: &str, url: &str) -> Result<Site> {
        self.store.delete_site(url).await?;
        self.store.create_site(name, url, SiteStatus::Queued).await
    }

    /// INDEXING, crawl, recompute lemma frequencies, INDEXED
    async fn index_site(&self, site: &Site, run: &Arc<RunContext>) -> Result<SiteReport> {
        self.store
            .update_site_status(site.id, SiteStatus::Indexing, None)
            .await?;

        let report = self.crawl_one(site, run).await?;

        let updated = self.store.recompute_lemma_frequencies(site.id).await?;
        self.store
            .update_site_status(site.id, SiteStatus::Indexed, None)
            .await?;
        info!(site = %site.url, pages = report.pages_indexed, lemmas = updated, "Site indexed");
        Ok(report)
    }

    /// Mark a site FAILED and add it to the run's failures. The failure is
    /// reported even when the status cannot be written.
    async fn fail_site(&self, site: &Site, cause: FailureCause, failed: &mut Vec<SiteFailure>) {
        if let Err(e) = self.mark_failed(site, &cause).await {
            error!(site = %site.url, error = %e, "Could not record site failure");
        }
        failed.push(SiteFailure {
            url: site.url.clone(),
            cause,
        });
    }

    /// Crawl one site in its own task so a stop request can abort it
    async fn crawl_one(&self, site: &Site, run: &Arc<RunContext>) -> Result<SiteReport> {
        let crawler = self.crawler.clone();
        let task_site = site.clone();
        let task_run = run.clone();
        let handle = tokio::spawn(async move { crawler.crawl_site(&task_site, task_run).await });

        {
            let mut state = self.state();
            if run.is_stopped() {
                handle.abort();
            } else {
                state.current = Some(handle.abort_handle());
            }
        }

        let joined = handle.await;
        self.state().current = None;

        match joined {
            Ok(Ok(stats)) => Ok(SiteReport {
                name: site.name.clone(),
                url: site.url.clone(),
                pages_indexed: stats.pages_indexed,
                pages_failed: stats.pages_failed,
            }),
            Ok(Err(e)) => Err(e),
            Err(e) if e.is_cancelled() => Err(Error::StoppedByUser),
            Err(e) => Err(Error::Other(format!("Crawl task panicked: {}", e))),
        }
    }

    async fn mark_failed(&self, site: &Site, cause: &FailureCause) -> Result<()> {
        let message = match cause.kind {
            FailureKind::StoppedByUser => cause.message.clone(),
            _ => cause.to_string(),
        };
        self.store
            .update_site_status(site.id, SiteStatus::Failed, Some(&message))
            .await
    }
}
