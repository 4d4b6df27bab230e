//! Custom error types for lemmasearch

use serde::Serialize;
use thiserror::Error;

/// Main error type for lemmasearch operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unable to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Too many page errors: {count}")]
    TooManyPageErrors { count: usize },

    #[error("Indexing stopped by user")]
    StoppedByUser,

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Page is outside the configured sites: {0}")]
    OutsideConfiguredSites(String),

    #[error("Empty search query")]
    EmptyQuery,

    #[error("Indexing is already running")]
    IndexingAlreadyRunning,

    #[error("Indexing is not running")]
    IndexingNotRunning,

    #[error("{0}")]
    IndexingFailed(IndexingFailure),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify this error as a per-site failure cause
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Fetch { .. } | Error::Http(_) => FailureKind::Unreachable,
            Error::InvalidUrl(_) | Error::UrlParse(_) => FailureKind::InvalidUrl,
            Error::StoppedByUser => FailureKind::StoppedByUser,
            Error::TooManyPageErrors { .. } => FailureKind::TooManyErrors,
            Error::Database(_) => FailureKind::Storage,
            _ => FailureKind::Internal,
        }
    }

    /// Convert into a structured site failure cause
    pub fn to_cause(&self) -> FailureCause {
        FailureCause::new(self.failure_kind(), self.to_string())
    }
}

/// Result type alias for lemmasearch
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a per-site indexing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unreachable,
    InvalidUrl,
    StoppedByUser,
    TooManyErrors,
    Storage,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Unreachable => write!(f, "unreachable"),
            FailureKind::InvalidUrl => write!(f, "invalid_url"),
            FailureKind::StoppedByUser => write!(f, "stopped_by_user"),
            FailureKind::TooManyErrors => write!(f, "too_many_errors"),
            FailureKind::Storage => write!(f, "storage"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}

/// Why a single site failed to index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCause {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureCause {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn stopped_by_user() -> Self {
        Self::new(FailureKind::StoppedByUser, Error::StoppedByUser.to_string())
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A site that failed during an indexing run
#[derive(Debug, Clone, Serialize)]
pub struct SiteFailure {
    pub url: String,
    pub cause: FailureCause,
}

/// Aggregated outcome of a run where at least one site failed
#[derive(Debug, Clone, Serialize)]
pub struct IndexingFailure {
    /// Failed sites, in the order they were attempted
    pub failed: Vec<SiteFailure>,
    /// Sites that reached INDEXED during the same run
    pub indexed: Vec<String>,
}

impl std::fmt::Display for IndexingFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "These sites failed indexing:")?;
        for failure in &self.failed {
            write!(f, "\n\t'{}': {}", failure.url, failure.cause)?;
        }
        if self.indexed.is_empty() {
            write!(f, "\nNo sites have been indexed")
        } else {
            write!(f, "\nIndexed: {}", self.indexed.join(", "))
        }
    }
}
