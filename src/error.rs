// src/error.rs
// =============================================================================
// Errors that stop a validation run before it starts.
//
// Everything that can go wrong *during* the crawl (refused connections,
// timeouts, odd status codes) is recorded in the report instead of being
// returned as an error. Only setup problems end up here:
// - a seed URL we can't parse or can't crawl
// - an include/skip pattern that isn't a valid regular expression
// - a log file we can't create
// - an HTTP client that fails to build
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Unsupported scheme '{scheme}' in {url} (only http and https can be crawled)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Could not create log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
