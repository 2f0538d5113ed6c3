// src/crawl/mod.rs
// =============================================================================
// This module walks a website and validates every link on it.
//
// Features:
// - Depth-first crawl starting from a seed URL
// - Every link is fetched at most once (the visited map)
// - Redirects are followed hop by hop, each hop validated on its own
// - Only pages on the seed's host are crawled into; links to other sites
//   are checked but not followed
// - Polite crawling with a delay between requests
// =============================================================================

mod engine;
mod visited;

pub use engine::CrawlEngine;
pub use visited::VisitedMap;
