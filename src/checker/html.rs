// src/checker/html.rs
// =============================================================================
// This module finds the links on a page.
//
// We use the `scraper` crate to parse HTML and pick out:
// - hyperlinks:   <a href="...">
// - stylesheets:  <link rel="stylesheet" href="...">
//
// and the `url` crate to turn each href into an absolute URL.
//
// Links that survive extraction are:
// - http or https (mailto:, javascript:, etc. are reported and dropped)
// - stripped of their #fragment when ignore_fragments is on
// - on the seed host when local mode is on
// - allowed by the include/skip patterns
//
// Pages on other hosts and pages that aren't HTML have no links as far as
// the crawler is concerned.
// =============================================================================

use super::filter::UrlFilter;
use super::http::{FetchError, HttpClient};
use crate::config::ValidationConfig;
use crate::error::SetupError;
use crate::report::ResponseLog;
use futures::future::{BoxFuture, FutureExt};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Which kind of link to pull out of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Anchor,
    Stylesheet,
}

// Something that can list the links on a page
//
// Both methods return absolute URLs, in document order. Problems found along
// the way (unreachable pages, invalid hrefs) are reported to `log`.
pub trait LinkExtractor: Send + Sync {
    fn links<'a>(
        &'a self,
        page: &'a str,
        log: &'a mut ResponseLog,
    ) -> BoxFuture<'a, Vec<String>>;
    fn stylesheet_links<'a>(
        &'a self,
        page: &'a str,
        log: &'a mut ResponseLog,
    ) -> BoxFuture<'a, Vec<String>>;
}

pub struct HtmlLinkExtractor {
    http: HttpClient,
    seed_host: String,
    ignore_fragments: bool,
    local: bool,
    filter: UrlFilter,
}

impl HtmlLinkExtractor {
    pub fn new(http: HttpClient, config: &ValidationConfig) -> Result<Self, SetupError> {
        Ok(Self {
            http,
            seed_host: config.seed_host().to_string(),
            ignore_fragments: config.ignore_fragments,
            local: config.local,
            filter: UrlFilter::new(&config.patterns)?,
        })
    }

    async fn extract(&self, page: &str, kind: LinkKind, log: &mut ResponseLog) -> Vec<String> {
        let base = match Url::parse(page) {
            Ok(url) => url,
            Err(_) => return Vec::new(),
        };

        // We never look inside pages on other sites
        if base.host_str() != Some(self.seed_host.as_str()) {
            return Vec::new();
        }

        // Ok(None) means the page isn't HTML, so it has no links to follow
        let body = match self.http.fetch_html(page).await {
            Ok(Some(body)) => body,
            Ok(None) => return Vec::new(),
            Err(FetchError::ConnectionRefused) => {
                log.error(&format!("Couldn't connect to {}", page));
                return Vec::new();
            }
            Err(FetchError::ConnectionProblems(detail)) => {
                log.error(&format!("Connection problems with {}: {}", page, detail));
                return Vec::new();
            }
            Err(FetchError::Other(detail)) => {
                log.error(&format!("Could not read {}: {}", page, detail));
                return Vec::new();
            }
        };

        extract_raw_links(&body, kind)
            .iter()
            .filter_map(|href| self.normalize(&base, href, log))
            .collect()
    }

    // Turns an href into the absolute URL we should validate, or None if the
    // link should be dropped
    fn normalize(&self, base: &Url, href: &str, log: &mut ResponseLog) -> Option<String> {
        let href = href.trim();

        let mut url = match resolve_href(base, href) {
            Some(url) => url,
            None => {
                log.error(&format!("Invalid url: {} - Called from: {}", href, base));
                return None;
            }
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            log.error(&format!("Invalid url - {}", url));
            return None;
        }

        if self.ignore_fragments {
            url.set_fragment(None);
        }

        if self.local && url.host_str() != Some(self.seed_host.as_str()) {
            debug!(link = %url, "Skipping link on another host");
            return None;
        }

        if !self.filter.allows(url.as_str()) {
            debug!(link = %url, "Skipping filtered link");
            return None;
        }

        Some(url.to_string())
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn links<'a>(
        &'a self,
        page: &'a str,
        log: &'a mut ResponseLog,
    ) -> BoxFuture<'a, Vec<String>> {
        self.extract(page, LinkKind::Anchor, log).boxed()
    }

    fn stylesheet_links<'a>(
        &'a self,
        page: &'a str,
        log: &'a mut ResponseLog,
    ) -> BoxFuture<'a, Vec<String>> {
        self.extract(page, LinkKind::Stylesheet, log).boxed()
    }
}

// Pulls the raw href values out of an HTML document
//
// Returns them exactly as written in the page, relative or not.
pub fn extract_raw_links(html: &str, kind: LinkKind) -> Vec<String> {
    let document = Html::parse_document(html);

    match kind {
        LinkKind::Anchor => {
            let selector = Selector::parse("a[href]").expect("constant selector is valid");
            document
                .select(&selector)
                .filter_map(|element| element.value().attr("href"))
                .map(str::to_string)
                .collect()
        }
        LinkKind::Stylesheet => {
            let selector = Selector::parse("link[href]").expect("constant selector is valid");
            document
                .select(&selector)
                .filter(|element| {
                    element
                        .value()
                        .attr("rel")
                        .map(|rel| {
                            rel.split_whitespace()
                                .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                        })
                        .unwrap_or(false)
                })
                .filter_map(|element| element.value().attr("href"))
                .map(str::to_string)
                .collect()
        }
    }
}

// Absolute hrefs are taken as-is, relative ones are joined onto the page URL
fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    match Url::parse(href) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(href).ok(),
        Err(_) => None,
    }
}
