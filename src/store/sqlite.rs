//! SQLite implementation of the index store

use super::{
    now_timestamp, IndexEntry, IndexStore, Lemma, NewPage, Page, Site, SiteStatus, SCHEMA_SQL,
};
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Index database handle
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the database named in the configuration
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='sites'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait]
impl IndexStore for SqliteStore {
    // ===== Site Operations =====

    async fn create_site(&self, name: &str, url: &str, status: SiteStatus) -> Result<Site> {
        let site = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (name, url, status, status_time, last_error)
            VALUES (?, ?, ?, ?, NULL)
            RETURNING id, name, url, status, status_time, last_error
            "#,
        )
        .bind(name)
        .bind(url)
        .bind(status.to_string())
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(site)
    }

    async fn get_site(&self, id: i64) -> Result<Option<Site>> {
        let site = sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(site)
    }

    async fn find_site_by_url(&self, url: &str) -> Result<Option<Site>> {
        let site = sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(site)
    }

    async fn list_sites(&self) -> Result<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>("SELECT * FROM sites ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(sites)
    }

    async fn update_site_status(
        &self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE sites SET status = ?, status_time = ?, last_error = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(now_timestamp())
            .bind(last_error)
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_site(&self, site_id: i64) -> Result<()> {
        sqlx::query("UPDATE sites SET status_time = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_site(&self, url: &str) -> Result<bool> {
        // Pages, lemmas and index entries cascade
        let result = sqlx::query("DELETE FROM sites WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ===== Page Operations =====

    async fn page_exists(&self, site_id: i64, path: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM pages WHERE site_id = ? AND path = ?")
                .bind(site_id)
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn insert_page_if_absent(&self, page: &NewPage) -> Result<Option<Page>> {
        let stored = sqlx::query_as::<_, Page>(
            r#"
            INSERT INTO pages (site_id, path, code, content)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(site_id, path) DO NOTHING
            RETURNING id, site_id, path, code, content
            "#,
        )
        .bind(page.site_id)
        .bind(&page.path)
        .bind(page.code)
        .bind(&page.content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn find_page(&self, site_id: i64, path: &str) -> Result<Option<Page>> {
        let page = sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE site_id = ? AND path = ?")
            .bind(site_id)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(page)
    }

    async fn get_page(&self, id: i64) -> Result<Option<Page>> {
        let page = sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(page)
    }

    async fn remove_page(&self, page_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE lemmas SET frequency = frequency - 1
            WHERE id IN (SELECT lemma_id FROM index_entries WHERE page_id = ?)
            "#,
        )
        .bind(page_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM lemmas
            WHERE frequency <= 0
              AND site_id = (SELECT site_id FROM pages WHERE id = ?)
            "#,
        )
        .bind(page_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM index_entries WHERE page_id = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn count_pages(&self, site_id: Option<i64>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE ? IS NULL OR site_id = ?")
            .bind(site_id)
            .bind(site_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ===== Lemma Operations =====

    async fn index_page(&self, page: &Page, lemmas: &HashMap<String, usize>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (lemma, count) in lemmas {
            let lemma_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO lemmas (site_id, lemma, frequency)
                VALUES (?, ?, 1)
                ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1
                RETURNING id
                "#,
            )
            .bind(page.site_id)
            .bind(lemma)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO index_entries (page_id, lemma_id, lemma_rank)
                VALUES (?, ?, ?)
                ON CONFLICT(page_id, lemma_id) DO UPDATE SET lemma_rank = excluded.lemma_rank
                "#,
            )
            .bind(page.id)
            .bind(lemma_id)
            .bind(*count as f64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(page = %page.path, lemmas = lemmas.len(), "Indexed page");
        Ok(())
    }

    async fn find_lemma(&self, site_id: i64, lemma: &str) -> Result<Option<Lemma>> {
        let found = sqlx::query_as::<_, Lemma>("SELECT * FROM lemmas WHERE site_id = ? AND lemma = ?")
            .bind(site_id)
            .bind(lemma)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    async fn count_lemmas(&self, site_id: Option<i64>) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lemmas WHERE ? IS NULL OR site_id = ?")
                .bind(site_id)
                .bind(site_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn index_entries(&self, page_id: i64) -> Result<Vec<IndexEntry>> {
        let entries =
            sqlx::query_as::<_, IndexEntry>("SELECT * FROM index_entries WHERE page_id = ? ORDER BY id")
                .bind(page_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(entries)
    }

    async fn page_lemma_ranks(&self, page_id: i64) -> Result<HashMap<String, f64>> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            r#"
            SELECT l.lemma, e.lemma_rank
            FROM index_entries e
            JOIN lemmas l ON l.id = e.lemma_id
            WHERE e.page_id = ?
            "#,
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn recompute_lemma_frequencies(&self, site_id: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE lemmas SET frequency = (
                SELECT COUNT(DISTINCT e.page_id)
                FROM index_entries e
                WHERE e.lemma_id = lemmas.id
            )
            WHERE site_id = ?
            "#,
        )
        .bind(site_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn pages_covering_lemmas(
        &self,
        site_id: Option<i64>,
        lemma_ids: &[i64],
    ) -> Result<Vec<Page>> {
        let ids: BTreeSet<i64> = lemma_ids.iter().copied().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let site_filter = if site_id.is_some() {
            "AND p.site_id = ?"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT p.id, p.site_id, p.path, p.code, p.content
            FROM pages p
            JOIN index_entries e ON e.page_id = p.id
            WHERE e.lemma_id IN ({}) {}
            GROUP BY p.id
            HAVING COUNT(DISTINCT e.lemma_id) = ?
            ORDER BY p.id
            "#,
            placeholders(ids.len()),
            site_filter
        );

        let mut query = sqlx::query_as::<_, Page>(&sql);
        for id in &ids {
            query = query.bind(*id);
        }
        if let Some(site_id) = site_id {
            query = query.bind(site_id);
        }
        let pages = query.bind(ids.len() as i64).fetch_all(&self.pool).await?;
        Ok(pages)
    }

    async fn sum_ranks(&self, page_id: i64, lemma_ids: &[i64]) -> Result<f64> {
        if lemma_ids.is_empty() {
            return Ok(0.0);
        }

        let sql = format!(
            "SELECT COALESCE(SUM(lemma_rank), 0.0) FROM index_entries WHERE page_id = ? AND lemma_id IN ({})",
            placeholders(lemma_ids.len())
        );
        let mut query = sqlx::query_scalar::<_, f64>(&sql).bind(page_id);
        for id in lemma_ids {
            query = query.bind(*id);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }
}
