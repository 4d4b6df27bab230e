//! Default values for configuration

/// Default User-Agent sent with every page fetch
pub fn default_crawl_user_agent() -> String {
    "Mozilla/5.0 (Windows; U; WindowsNT 5.1; en-US; rv1.8.1.6) Gecko/20070725 Firefox/2.0.0.6"
        .to_string()
}

/// Default Referer sent with every page fetch
pub fn default_crawl_referrer() -> String {
    "http://www.google.com".to_string()
}

/// Default number of page fetches in flight per site
pub fn default_crawl_max_concurrent_fetches() -> usize {
    16
}

/// Default number of failed non-homepage fetches tolerated per run
pub fn default_crawl_page_error_margin() -> usize {
    500_000
}

/// Default site frequency above which a query lemma is considered too common
pub fn default_search_rarity_threshold() -> i64 {
    500_000
}

/// Default number of search results returned
pub fn default_search_limit() -> usize {
    20
}

/// Default snippet display length in characters
pub fn default_snippet_length() -> usize {
    245
}

/// Default number of characters searched backwards for a sentence start
pub fn default_snippet_lookback() -> usize {
    170
}
