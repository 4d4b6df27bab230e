//! HTML parsing and text extraction
//!
//! This module handles:
//! - Visible text extraction with boilerplate stripped
//! - Title and link extraction
//! - Whitespace normalization

mod html;

pub use html::*;

/// Parsed page with extracted content
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Contents of `<title>` (if found)
    pub title: Option<String>,

    /// Visible text, whitespace collapsed
    pub text: String,

    /// Absolute outbound links, in document order without duplicates
    pub links: Vec<url::Url>,
}

/// Collapse every whitespace run into a single space and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_was_whitespace = true;

    for c in text.chars() {
        if c.is_whitespace() {
            last_was_whitespace = true;
        } else {
            if last_was_whitespace && !result.is_empty() {
                result.push(' ');
            }
            result.push(c);
            last_was_whitespace = false;
        }
    }

    result
}
