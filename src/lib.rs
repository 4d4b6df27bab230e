//! lemmasearch - crawl websites into a lemma index and search them
//!
//! Sites listed in the configuration are crawled page by page. Every page's
//! visible text is reduced to dictionary forms ("lemmas") whose counts are
//! stored per page, and free-text queries are answered with pages ranked by
//! the summed counts of the query's lemmas plus a highlighted snippet.

pub mod commands;
pub mod config;
pub mod crawl;
pub mod error;
pub mod indexer;
pub mod lemma;
pub mod morph;
pub mod parse;
pub mod search;
pub mod store;

pub use error::{Error, Result};
