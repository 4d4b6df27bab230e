//! Same-site link filtering

use crate::config::same_site;
use url::Url;

/// Extensions of resources that are never HTML pages
const SKIPPED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "ico", "webp", "pdf", "doc", "docx", "xls",
    "xlsx", "ppt", "pptx", "css", "js", "zip", "rar", "gz", "tar", "7z", "mp3", "mp4", "avi",
    "woff", "woff2", "ttf",
];

/// Check whether a discovered link should be fetched as part of a site crawl
pub fn is_crawlable_link(site_url: &Url, link: &Url) -> bool {
    if !same_site(site_url, link) || !link.path().starts_with(site_url.path()) {
        return false;
    }

    if link.query().is_some() || link.fragment().is_some() {
        return false;
    }

    let lower = link.as_str().to_lowercase();
    if lower.contains("mailto:") || lower.contains("tags") || lower.contains("tagged") {
        return false;
    }

    if is_homepage(site_url, link) {
        return false;
    }

    let last_segment = link
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("");

    if !last_segment.is_empty() && last_segment.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    if let Some((_, ext)) = last_segment.rsplit_once('.') {
        if SKIPPED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            return false;
        }
    }

    true
}

/// Whether `url` points at the site root itself
pub fn is_homepage(site_url: &Url, url: &Url) -> bool {
    same_site(site_url, url) && url.path() == site_url.path()
}

/// Stored page path: the site URL for the homepage, the URL path otherwise
pub fn page_path(site_url: &Url, url: &Url) -> String {
    if is_homepage(site_url, url) {
        site_url.to_string()
    } else {
        url.path().to_string()
    }
}
