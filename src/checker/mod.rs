// src/checker/mod.rs
// =============================================================================
// This module contains the pieces the crawl engine talks to.
//
// Submodules:
// - http: Fetches a URL and reports its status (the RequestClient trait)
// - html: Finds the links on a page (the LinkExtractor trait)
// - filter: Include/skip patterns for discovered links
//
// This file (mod.rs) is the module root - it re-exports the public API so
// the rest of the program can write `checker::HttpClient` instead of
// `checker::http::HttpClient`.
// =============================================================================

mod filter;
mod html;
mod http;

pub use html::{HtmlLinkExtractor, LinkExtractor};
pub use http::{FetchError, HttpClient, RequestClient};

#[cfg(test)]
pub use http::FetchResponse;
