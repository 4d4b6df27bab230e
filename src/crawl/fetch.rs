//! Page fetching

use crate::config::CrawlConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub html: String,
}

/// Retrieves raw HTML for a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`; connectivity problems and non-success statuses are `Error::Fetch`
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// reqwest-backed fetcher sending fixed identification headers
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let referrer = HeaderValue::from_str(&config.referrer)
            .map_err(|e| Error::Config(format!("Invalid referrer header: {}", e)))?;
        headers.insert(REFERER, referrer);

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        debug!("Fetching: {}", url);

        let fetch_error = |reason: String| Error::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let html = response.text().await.map_err(|e| fetch_error(e.to_string()))?;
        Ok(FetchedPage {
            status: status.as_u16(),
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_sends_identification_headers() {
        let mock_server = MockServer::start().await;
        let config = CrawlConfig::default();

        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", config.user_agent.as_str()))
            .and(header("referer", "http://www.google.com"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"<p>hi</p>".to_vec(), "text/html"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&config).unwrap();
        let url = Url::parse(&format!("{}/page", mock_server.uri())).unwrap();
        let page = fetcher.fetch(&url).await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.html, "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&CrawlConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/broken", mock_server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
