//! HTML parsing and text extraction

use super::{normalize_whitespace, ParsedPage};
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text never counts as page content
const BOILERPLATE_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "noscript", "iframe", "a", "button",
];

/// Elements that separate words when their text is concatenated
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "body", "br", "caption", "dd", "div", "dl", "dt",
    "figcaption", "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "li",
    "main", "ol", "p", "pre", "section", "summary", "table", "td", "th", "title", "tr", "ul",
];

fn is_boilerplate(element: &Element) -> bool {
    let name = element.name();
    BOILERPLATE_ELEMENTS.contains(&name)
        || (name == "label" && element.attr("for") == Some("captcha_accept"))
}

/// Visible text of an element subtree, boilerplate removed
fn collect_visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    // `None` marks the end of a block element
    let mut stack: Vec<Option<_>> = root.children().rev().map(Some).collect();

    // Iterative walk: deeply nested markup must not exhaust the call stack
    while let Some(visit) = stack.pop() {
        let Some(node) = visit else {
            out.push(' ');
            continue;
        };

        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                if is_boilerplate(element) {
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&element.name());
                if block {
                    out.push(' ');
                    stack.push(None);
                }
                stack.extend(node.children().rev().map(Some));
            }
            _ => {}
        }
    }

    normalize_whitespace(&out)
}

/// Visible text of an HTML document
pub fn visible_text(content: &str) -> String {
    let document = Html::parse_document(content);
    collect_visible_text(document.root_element())
}

/// Text of the `<title>` element, if present and non-empty
pub fn extract_title(content: &str) -> Option<String> {
    let document = Html::parse_document(content);
    title_of(&document)
}

fn title_of(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()
        .map(|elem| normalize_whitespace(&elem.text().collect::<String>()))?;
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn links_of(document: &Html, base: &Url) -> Vec<Url> {
    let mut links = Vec::new();
    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    let mut seen = HashSet::new();
    for elem in document.select(&selector) {
        if let Some(href) = elem.value().attr("href") {
            // Resolve relative URLs
            if let Ok(url) = base.join(href.trim()) {
                if seen.insert(url.to_string()) {
                    links.push(url);
                }
            }
        }
    }
    links
}

/// Absolute links found in `<a href>` elements, resolved against `base`
pub fn extract_links(content: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(content);
    links_of(&document, base)
}

/// Parse an HTML page in one pass: title, visible text and links
pub fn parse_html(content: &str, base: &Url) -> ParsedPage {
    let document = Html::parse_document(content);
    ParsedPage {
        title: title_of(&document),
        text: collect_visible_text(document.root_element()),
        links: links_of(&document, base),
    }
}
