//! Configuration management for lemmasearch
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sites to crawl and index
    #[serde(default)]
    pub sites: Vec<SiteConfig>,

    /// Web crawling configuration
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// One configured crawl target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root URL
    pub url: String,

    /// Display name
    pub name: String,
}

impl SiteConfig {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// Web crawling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// User agent string
    #[serde(default = "default_crawl_user_agent")]
    pub user_agent: String,

    /// Referer header value
    #[serde(default = "default_crawl_referrer")]
    pub referrer: String,

    /// Request timeout in seconds (client default when unset)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Maximum page fetches in flight for one site
    #[serde(default = "default_crawl_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Failed page fetches tolerated across a whole run before it is aborted
    #[serde(default = "default_crawl_page_error_margin")]
    pub page_error_margin: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Lemmas present on more pages than this are dropped from the query
    #[serde(default = "default_search_rarity_threshold")]
    pub rarity_threshold: i64,

    /// Default number of results
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Target snippet length in characters
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,

    /// How far back from a match a snippet sentence may start
    #[serde(default = "default_snippet_lookback")]
    pub snippet_lookback: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for lemmasearch data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            crawl: CrawlConfig::default(),
            search: SearchConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: default_crawl_user_agent(),
            referrer: default_crawl_referrer(),
            timeout_secs: None,
            max_concurrent_fetches: default_crawl_max_concurrent_fetches(),
            page_error_margin: default_crawl_page_error_margin(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rarity_threshold: default_search_rarity_threshold(),
            default_limit: default_search_limit(),
            snippet_length: default_snippet_length(),
            snippet_lookback: default_snippet_lookback(),
        }
    }
}

impl Config {
    /// Get the default base directory for lemmasearch (~/.lemmasearch)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lemmasearch")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("index.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("index.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(Error::Config("at least one [[sites]] entry is required".to_string()));
        }

        for site in &self.sites {
            if site.url.trim().is_empty() {
                return Err(Error::Config(format!("site '{}' has an empty url", site.name)));
            }
        }

        if self.crawl.max_concurrent_fetches == 0 {
            return Err(Error::Config(
                "crawl.max_concurrent_fetches must be positive".to_string(),
            ));
        }

        if self.search.snippet_length == 0 {
            return Err(Error::Config(
                "search.snippet_length must be positive".to_string(),
            ));
        }

        if self.search.rarity_threshold < 1 {
            return Err(Error::Config(
                "search.rarity_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Clean up a user-supplied address.
///
/// Percent-decodes, strips a leading `url=` and surrounding quotes, and adds
/// `https://` when no scheme is present.
pub fn clean_url_input(raw: &str) -> String {
    let decoded = urlencoding::decode(raw.trim())
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.trim().to_string());

    let mut url = decoded.strip_prefix("url=").unwrap_or(&decoded).to_string();
    if url.len() >= 2 && url.starts_with('"') && url.ends_with('"') {
        url = url[1..url.len() - 1].to_string();
    }
    if !url.contains("://") {
        url = format!("https://{}", url);
    }
    url
}

/// Bring a user-supplied site address into canonical form: cleaned up as by
/// [`clean_url_input`] and ending in a slash
pub fn format_site_url(raw: &str) -> String {
    let mut url = clean_url_input(raw);
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Format and validate a site address; only http(s) URLs with a host pass
pub fn validate_site_url(raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidUrl("empty url".to_string()));
    }
    let formatted = format_site_url(raw);
    let url = Url::parse(&formatted).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.host_str() {
        Some(host) if !host.is_empty() && !host.contains(' ') => {}
        _ => return Err(Error::InvalidUrl(format!("{}: missing host", raw))),
    }
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::InvalidUrl(format!("{}: unsupported scheme", raw)));
    }
    Ok(url)
}

/// First site whose canonical URL covers `page_url` (same site, path under the site root)
pub fn find_site_for_url<'a>(sites: &'a [SiteConfig], page_url: &Url) -> Option<&'a SiteConfig> {
    sites.iter().find(|site| {
        validate_site_url(&site.url)
            .map(|site_url| {
                same_site(&site_url, page_url) && page_url.path().starts_with(site_url.path())
            })
            .unwrap_or(false)
    })
}

/// Host with any leading `www.` removed
pub fn bare_host(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.strip_prefix("www.").unwrap_or(h).to_ascii_lowercase())
}

/// Same scheme, port and host, ignoring a leading `www.` on either side
pub fn same_site(site: &Url, other: &Url) -> bool {
    site.scheme() == other.scheme()
        && site.port_or_known_default() == other.port_or_known_default()
        && bare_host(site).is_some()
        && bare_host(site) == bare_host(other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> Config {
        let mut config = Config::default();
        config.sites.push(SiteConfig::new("https://example.com", "Example"));
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.rarity_threshold, 500_000);
        assert_eq!(config.crawl.page_error_margin, 500_000);
        assert!(config.crawl.timeout_secs.is_none());
        // No sites configured yet
        assert!(config.validate().is_err());
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = sample_config();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.search.default_limit = 7;

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load(&config.paths.config_file).unwrap();
        assert_eq!(loaded.search.default_limit, 7);
        assert_eq!(loaded.sites, config.sites);
        assert_eq!(loaded.paths.db_file, tmp.path().join("index.db"));
    }

    #[test]
    fn test_parse_sites_from_toml() {
        let toml = r#"
            [[sites]]
            url = "https://www.playback.ru"
            name = "PlayBack.Ru"

            [[sites]]
            url = "https://skillbox.ru/"
            name = "Skillbox"

            [crawl]
            max_concurrent_fetches = 4
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.crawl.max_concurrent_fetches, 4);
        assert_eq!(config.search.snippet_length, 245);
    }

    #[test]
    fn test_config_validation() {
        let mut config = sample_config();
        config.crawl.max_concurrent_fetches = 0;
        assert!(config.validate().is_err());

        config.crawl.max_concurrent_fetches = 2;
        config.search.snippet_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_site_url() {
        assert_eq!(format_site_url("example.com"), "https://example.com/");
        assert_eq!(format_site_url("http://example.com"), "http://example.com/");
        assert_eq!(
            format_site_url("url=https%3A%2F%2Fexample.com%2Fnews"),
            "https://example.com/news/"
        );
        assert_eq!(format_site_url("\"https://example.com/\""), "https://example.com/");
    }

    #[test]
    fn test_clean_url_input_keeps_path() {
        assert_eq!(clean_url_input("example.com/news/item"), "https://example.com/news/item");
        assert_eq!(clean_url_input("ftp://example.com"), "ftp://example.com");
        assert_eq!(
            clean_url_input("url=http%3A%2F%2Fexample.com%2Fa"),
            "http://example.com/a"
        );
    }

    #[test]
    fn test_validate_site_url() {
        assert!(validate_site_url("https://example.com").is_ok());
        assert!(validate_site_url("").is_err());
        assert!(validate_site_url("ftp://example.com").is_err());
        assert!(validate_site_url("https://exa mple.com").is_err());
    }

    #[test]
    fn test_same_site_tolerates_www() {
        let site = Url::parse("https://www.example.com/").unwrap();
        assert!(same_site(&site, &Url::parse("https://example.com/a").unwrap()));
        assert!(same_site(&site, &Url::parse("https://www.example.com/b").unwrap()));
        assert!(!same_site(&site, &Url::parse("http://example.com/a").unwrap()));
        assert!(!same_site(&site, &Url::parse("https://other.com/a").unwrap()));
    }

    #[test]
    fn test_find_site_for_url() {
        let config = sample_config();
        let url = Url::parse("https://www.example.com/page").unwrap();
        assert_eq!(find_site_for_url(&config.sites, &url).unwrap().name, "Example");
        let outside = Url::parse("https://elsewhere.org/page").unwrap();
        assert!(find_site_for_url(&config.sites, &outside).is_none());
    }
}
