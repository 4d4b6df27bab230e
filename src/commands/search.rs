//! Search command implementation

use crate::config::Config;
use crate::error::Result;
use crate::parse::{extract_title, visible_text};
use crate::search::{Ranker, RankedPage, SearchOutcome, SnippetBuilder};
use serde::Serialize;
use tracing::info;

/// Search options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Restrict the search to one site URL
    pub site: Option<String>,
    pub offset: usize,
    /// Page size; `None` uses the configured default, `Some(0)` returns all
    pub limit: Option<usize>,
}

/// A single search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Site URL without the trailing slash
    pub site: String,
    pub site_name: String,
    /// Page path; empty for the homepage
    pub uri: String,
    pub title: String,
    pub snippet: String,
    pub relevance: f64,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Total number of ranked pages, regardless of offset and limit
    pub count: usize,
    pub data: Vec<SearchHit>,
}

/// Rank pages for `query` and build one page of results
pub async fn cmd_search(
    config: &Config,
    ranker: &Ranker,
    snippets: &SnippetBuilder,
    query: &str,
    options: SearchOptions,
) -> Result<SearchResponse> {
    info!("Searching for: {}", query);

    let ranked = match ranker
        .rank(query, options.site.as_deref(), &config.sites)
        .await?
    {
        SearchOutcome::Found(ranked) => ranked,
        SearchOutcome::NoResults(reason) => {
            info!(%reason, "No results");
            return Ok(SearchResponse {
                result: false,
                error: Some(reason.to_string()),
                count: 0,
                data: Vec::new(),
            });
        }
    };

    let limit = match options.limit.unwrap_or(config.search.default_limit) {
        0 => ranked.len(),
        n => n,
    };
    let data = ranked
        .iter()
        .skip(options.offset)
        .take(limit)
        .map(|entry| to_hit(entry, snippets, query))
        .collect();

    Ok(SearchResponse {
        result: true,
        error: None,
        count: ranked.len(),
        data,
    })
}

fn to_hit(entry: &RankedPage, snippets: &SnippetBuilder, query: &str) -> SearchHit {
    let RankedPage { page, site, .. } = entry;
    let uri = if page.path == site.url {
        String::new()
    } else {
        page.path.clone()
    };

    SearchHit {
        site: site.url.trim_end_matches('/').to_string(),
        site_name: site.name.clone(),
        uri,
        title: extract_title(&page.content).unwrap_or_default(),
        snippet: snippets.build(&visible_text(&page.content), query),
        relevance: entry.relevance,
    }
}

pub fn print_search_results(query: &str, response: &SearchResponse) {
    println!("\n🔍 Query: {}\n", query);

    if !response.result {
        println!("No results: {}", response.error.as_deref().unwrap_or("nothing found"));
        return;
    }

    println!(
        "Found {} results, showing {}:\n",
        response.count,
        response.data.len()
    );
    for (i, hit) in response.data.iter().enumerate() {
        println!("{}. [relevance: {:.3}] {}{}", i + 1, hit.relevance, hit.site, hit.uri);
        if !hit.title.is_empty() {
            println!("   Title: {}", hit.title);
        }
        println!("   Site: {}", hit.site_name);
        if !hit.snippet.is_empty() {
            println!("   {}", hit.snippet);
        }
        println!();
    }
}
