//! Index storage
//!
//! This module holds the persistent inverted index:
//! - Sites (configured crawl targets and their status)
//! - Pages (fetched HTML per site)
//! - Lemmas (dictionary forms with site-wide page frequency)
//! - Index entries (per-page lemma rank)

mod schema;
mod sqlite;

pub use schema::*;
pub use sqlite::SqliteStore;

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use std::str::FromStr;

/// Site indexing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    Queued,
    Indexing,
    Indexed,
    Failed,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Queued => write!(f, "QUEUED"),
            SiteStatus::Indexing => write!(f, "INDEXING"),
            SiteStatus::Indexed => write!(f, "INDEXED"),
            SiteStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for SiteStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Ok(SiteStatus::Queued),
            "INDEXING" => Ok(SiteStatus::Indexing),
            "INDEXED" => Ok(SiteStatus::Indexed),
            "FAILED" => Ok(SiteStatus::Failed),
            _ => Err(Error::Other(format!("Unknown site status: {}", s))),
        }
    }
}

/// A stored site
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub status: String,
    pub status_time: String,
    pub last_error: Option<String>,
}

impl Site {
    pub fn get_status(&self) -> Result<SiteStatus> {
        self.status.parse()
    }
}

/// A stored page
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: i64,
    pub content: String,
}

/// A page about to be stored
#[derive(Debug, Clone)]
pub struct NewPage {
    pub site_id: i64,
    pub path: String,
    pub code: i64,
    pub content: String,
}

/// A stored lemma with its site-wide frequency
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lemma {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: i64,
}

/// Rank of one lemma on one page
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: i64,
    pub page_id: i64,
    pub lemma_id: i64,
    #[sqlx(rename = "lemma_rank")]
    pub rank: f64,
}

/// Current timestamp as stored in `status_time`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Persistent inverted index.
///
/// Lookups that can miss return `Option`; errors are reserved for storage
/// failures.
#[async_trait]
pub trait IndexStore: Send + Sync {
    // ===== Sites =====

    /// Create a site record with the given status
    async fn create_site(&self, name: &str, url: &str, status: SiteStatus) -> Result<Site>;

    async fn get_site(&self, id: i64) -> Result<Option<Site>>;

    async fn find_site_by_url(&self, url: &str) -> Result<Option<Site>>;

    async fn list_sites(&self) -> Result<Vec<Site>>;

    /// Set status, refresh `status_time`, and replace `last_error`
    async fn update_site_status(
        &self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> Result<()>;

    /// Refresh `status_time` only
    async fn touch_site(&self, site_id: i64) -> Result<()>;

    /// Delete a site and everything stored for it; returns whether it existed
    async fn delete_site(&self, url: &str) -> Result<bool>;

    // ===== Pages =====

    async fn page_exists(&self, site_id: i64, path: &str) -> Result<bool>;

    /// Atomically store a page unless (site, path) is taken.
    /// Returns the stored page, or `None` if another writer got there first.
    async fn insert_page_if_absent(&self, page: &NewPage) -> Result<Option<Page>>;

    async fn find_page(&self, site_id: i64, path: &str) -> Result<Option<Page>>;

    async fn get_page(&self, id: i64) -> Result<Option<Page>>;

    /// Delete a page, decrementing the frequency of every lemma it used and
    /// deleting lemmas no page uses any more; returns whether it existed
    async fn remove_page(&self, page_id: i64) -> Result<bool>;

    async fn count_pages(&self, site_id: Option<i64>) -> Result<i64>;

    // ===== Lemmas and index entries =====

    /// Store lemma counts for a page that has no index entries yet,
    /// creating lemmas or incrementing their frequency
    async fn index_page(&self, page: &Page, lemmas: &HashMap<String, usize>) -> Result<()>;

    async fn find_lemma(&self, site_id: i64, lemma: &str) -> Result<Option<Lemma>>;

    async fn count_lemmas(&self, site_id: Option<i64>) -> Result<i64>;

    async fn index_entries(&self, page_id: i64) -> Result<Vec<IndexEntry>>;

    /// Lemma text -> rank for one page
    async fn page_lemma_ranks(&self, page_id: i64) -> Result<HashMap<String, f64>>;

    /// Overwrite every lemma frequency of a site with its distinct page count
    async fn recompute_lemma_frequencies(&self, site_id: i64) -> Result<u64>;

    /// Pages (within one site, or across all sites) indexed under every
    /// lemma id in `lemma_ids`
    async fn pages_covering_lemmas(
        &self,
        site_id: Option<i64>,
        lemma_ids: &[i64],
    ) -> Result<Vec<Page>>;

    /// Sum of ranks on a page over the given lemma ids
    async fn sum_ranks(&self, page_id: i64, lemma_ids: &[i64]) -> Result<f64>;
}
