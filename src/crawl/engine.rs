// src/crawl/engine.rs
// =============================================================================
// The crawl engine: walks a site and validates every link it finds.
//
// How it works:
// 1. Ask the link extractor for the links on the seed page
// 2. For each link, in order:
//    a. Skip it if we've already fetched it
//    b. Fetch it and log the status
//    c. If the server redirected, validate the redirect target too, as if it
//       had been found on the same page as the original link
//    d. If the link is on the seed's host, do all of this for its links
//    e. Wait `config.wait` before moving on to the next link
// 3. With CSS checking on, stylesheets of same-host pages are fetched and
//    logged as well, but never looked inside
//
// This is a depth-first walk. Instead of recursing (which can blow the stack
// on deep sites) we keep an explicit stack of tasks. Tasks for a link are
// pushed in reverse so they pop off in document order, and everything a link
// triggers runs before the pause that follows it.
//
// Rust concepts:
// - Generics: CrawlEngine<C, E> works with any client/extractor
// - Enums with data: Task carries what each step needs
// - Vec as a stack: push() / pop()
// =============================================================================

use super::visited::VisitedMap;
use crate::checker::{FetchError, HtmlLinkExtractor, HttpClient, LinkExtractor, RequestClient};
use crate::config::ValidationConfig;
use crate::error::SetupError;
use crate::report::{Report, ResponseLog, ResponseRecord, Status, TracingSink};
use tracing::{debug, info};
use url::Url;

// One unit of work on the crawl stack
#[derive(Debug, Clone, PartialEq, Eq)]
enum Task {
    /// Validate a page, then crawl into it if it's on our host
    VisitPage { url: String, from: String },
    /// Validate a stylesheet (or other non-HTML resource), never crawled into
    VisitResource { url: String, from: String },
    /// Queue up every link on a page
    ExpandLinks { page: String },
    /// Queue up every stylesheet on a page
    ExpandStylesheets { page: String },
    /// Crawl delay between sibling links
    Pause,
}

// What happened when we fetched a link
#[derive(Debug, Clone, PartialEq, Eq)]
enum Visit {
    /// Got a response; maybe a redirect to follow
    Responded { redirect: Option<String> },
    /// Connection refused or other network trouble. Recorded, nothing to follow.
    Unreachable,
    /// Unexpected failure. Logged but not recorded, so it can be tried again.
    Abandoned,
}

pub struct CrawlEngine<C, E> {
    config: ValidationConfig,
    client: C,
    extractor: E,
    log: ResponseLog,
    visited: VisitedMap,
}

impl CrawlEngine<HttpClient, HtmlLinkExtractor> {
    // Builds an engine with the real HTTP client, HTML extractor and a
    // tracing-backed log (plus the log file, if the config asks for one)
    pub fn from_config(config: ValidationConfig) -> Result<Self, SetupError> {
        let client = HttpClient::new(config.credentials.clone())?;
        let extractor = HtmlLinkExtractor::new(client.clone(), &config)?;
        let log = ResponseLog::new(Box::new(TracingSink), config.logfile.as_deref())?;

        Ok(Self::new(config, client, extractor, log))
    }
}

impl<C, E> CrawlEngine<C, E>
where
    C: RequestClient,
    E: LinkExtractor,
{
    pub fn new(config: ValidationConfig, client: C, extractor: E, log: ResponseLog) -> Self {
        Self {
            config,
            client,
            extractor,
            log,
            visited: VisitedMap::default(),
        }
    }

    /// Crawls the site from the seed URL and returns everything that was fetched.
    pub async fn validate(mut self) -> Report {
        let seed = self.config.seed.to_string();
        info!(seed = %seed, "Validating links");

        let mut stack = vec![Task::ExpandLinks { page: seed }];

        while let Some(task) = stack.pop() {
            self.run(task, &mut stack).await;
        }

        self.log.close();

        info!(
            links = self.visited.len(),
            errors = self.visited.errors().len(),
            "Validation finished"
        );

        Report::from(self.visited)
    }

    async fn run(&mut self, task: Task, stack: &mut Vec<Task>) {
        match task {
            Task::ExpandLinks { page } => {
                let links = self.extractor.links(&page, &mut self.log).await;
                debug!(page = %page, count = links.len(), "Found links");

                for url in links.into_iter().rev() {
                    stack.push(Task::Pause);
                    stack.push(Task::VisitPage {
                        url,
                        from: page.clone(),
                    });
                }
            }

            Task::ExpandStylesheets { page } => {
                let links = self.extractor.stylesheet_links(&page, &mut self.log).await;
                debug!(page = %page, count = links.len(), "Found stylesheets");

                for url in links.into_iter().rev() {
                    stack.push(Task::Pause);
                    stack.push(Task::VisitResource {
                        url,
                        from: page.clone(),
                    });
                }
            }

            Task::VisitPage { url, from } => {
                if self.visited.contains(&url) {
                    return;
                }

                let redirect = match self.fetch_and_classify(&url, &from).await {
                    Visit::Responded { redirect } => redirect,
                    // An unreachable page has no body to read links from
                    Visit::Unreachable | Visit::Abandoned => return,
                };

                let same_domain = self.is_same_domain(&url);
                let mut next = Vec::new();

                if let Some(target) = redirect {
                    next.push(Task::VisitPage {
                        url: target,
                        from: from.clone(),
                    });
                }
                if same_domain {
                    next.push(Task::ExpandLinks { page: url.clone() });
                    if self.config.css {
                        next.push(Task::ExpandStylesheets { page: url });
                    }
                }

                stack.extend(next.into_iter().rev());
            }

            Task::VisitResource { url, from } => {
                if self.visited.contains(&url) {
                    return;
                }

                if let Visit::Responded {
                    redirect: Some(target),
                } = self.fetch_and_classify(&url, &from).await
                {
                    stack.push(Task::VisitPage { url: target, from });
                }
            }

            Task::Pause => {
                if !self.config.wait.is_zero() {
                    tokio::time::sleep(self.config.wait).await;
                }
            }
        }
    }

    // Fetches one link, logs the result and records it in the visited map
    async fn fetch_and_classify(&mut self, link: &str, from: &str) -> Visit {
        let response = match self.client.get(link).await {
            Ok(response) => response,
            Err(FetchError::ConnectionRefused) => {
                self.record(Status::ConnectionRefused, link, from, None);
                return Visit::Unreachable;
            }
            Err(FetchError::ConnectionProblems(detail)) => {
                debug!(link, %detail, "Connection problems");
                self.record(Status::ConnectionProblems, link, from, None);
                return Visit::Unreachable;
            }
            Err(FetchError::Other(detail)) => {
                self.log.error(&format!(
                    "Unknown error {} - {} - Called from: {}",
                    detail, link, from
                ));
                return Visit::Abandoned;
            }
        };

        let redirect = match response.location.as_deref() {
            Some(location) => match resolve_redirect(link, location) {
                Ok(target) => Some(target),
                Err(e) => {
                    self.log.error(&format!(
                        "Unknown error invalid redirect '{}' ({}) - {} - Called from: {}",
                        location, e, link, from
                    ));
                    return Visit::Abandoned;
                }
            },
            None => None,
        };

        self.record(Status::Code(response.status), link, from, redirect.as_deref());

        Visit::Responded { redirect }
    }

    fn record(&mut self, status: Status, link: &str, from: &str, redirect: Option<&str>) {
        self.log.record(&ResponseRecord {
            status,
            link,
            from,
            redirect,
        });
        self.visited.insert(link, status);
    }

    fn is_same_domain(&self, link: &str) -> bool {
        match Url::parse(link) {
            Ok(url) => url.host_str() == Some(self.config.seed_host()),
            Err(_) => false,
        }
    }
}

// Works out where a Location header points
//
// Absolute locations are used verbatim; relative ones are resolved against
// the link that was fetched (not the page it was found on).
//
// Examples:
//   link = "http://example.com/bar", location = "/foo"
//     -> "http://example.com/foo"
//   location = "http://other.com/x"
//     -> "http://other.com/x"
pub fn resolve_redirect(link: &str, location: &str) -> Result<String, url::ParseError> {
    match Url::parse(location) {
        Ok(_) => Ok(location.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(link)?;
            Ok(base.join(location)?.to_string())
        }
        Err(e) => Err(e),
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a task stack instead of recursion?
//    - Each page we crawl into would be one more level of recursion
//    - A site with a long chain of pages could overflow the stack
//    - Recursive async functions also need boxing in Rust
//    - A Vec<Task> grows on the heap, so depth doesn't matter
//
// 2. Why push tasks in reverse?
//    - pop() takes from the end of the Vec (last in, first out)
//    - Pushing [c, b, a] means we pop a, then b, then c
//
// 3. Why is the visited map only written in fetch_and_classify?
//    - A link counts as visited once we have a status for it
//    - Links that failed in an unexpected way are left out on purpose,
//      so a later page linking to them gets another try
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::FetchResponse;
    use crate::report::{MemorySink, Severity};
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const SEED: &str = "http://example.com/";

    // Serves canned responses and remembers every URL it was asked for
    #[derive(Default, Clone)]
    struct FakeClient {
        responses: HashMap<String, Result<FetchResponse, FetchError>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeClient {
        fn status(mut self, url: &str, status: u16) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(FetchResponse {
                    status,
                    location: None,
                }),
            );
            self
        }

        fn redirect(mut self, url: &str, status: u16, location: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(FetchResponse {
                    status,
                    location: Some(location.to_string()),
                }),
            );
            self
        }

        fn fail(mut self, url: &str, error: FetchError) -> Self {
            self.responses.insert(url.to_string(), Err(error));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, url: &str) -> usize {
            self.calls().iter().filter(|c| c.as_str() == url).count()
        }
    }

    impl RequestClient for FakeClient {
        fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
            self.calls.lock().unwrap().push(url.to_string());
            let result = self.responses.get(url).cloned().unwrap_or(Ok(FetchResponse {
                status: 200,
                location: None,
            }));
            async move { result }.boxed()
        }
    }

    // A link graph held in memory
    #[derive(Default)]
    struct FakeExtractor {
        links: HashMap<String, Vec<String>>,
        stylesheets: HashMap<String, Vec<String>>,
        expanded: Arc<Mutex<Vec<String>>>,
    }

    impl FakeExtractor {
        fn page(mut self, page: &str, links: &[&str]) -> Self {
            self.links
                .insert(page.to_string(), links.iter().map(|l| l.to_string()).collect());
            self
        }

        fn css(mut self, page: &str, links: &[&str]) -> Self {
            self.stylesheets
                .insert(page.to_string(), links.iter().map(|l| l.to_string()).collect());
            self
        }
    }

    impl LinkExtractor for FakeExtractor {
        fn links<'a>(
            &'a self,
            page: &'a str,
            _log: &'a mut ResponseLog,
        ) -> BoxFuture<'a, Vec<String>> {
            self.expanded.lock().unwrap().push(page.to_string());
            let links = self.links.get(page).cloned().unwrap_or_default();
            async move { links }.boxed()
        }

        fn stylesheet_links<'a>(
            &'a self,
            page: &'a str,
            _log: &'a mut ResponseLog,
        ) -> BoxFuture<'a, Vec<String>> {
            let links = self.stylesheets.get(page).cloned().unwrap_or_default();
            async move { links }.boxed()
        }
    }

    fn config() -> ValidationConfig {
        ValidationConfig::new(SEED).unwrap().with_wait(Duration::ZERO)
    }

    fn engine(
        config: ValidationConfig,
        client: FakeClient,
        extractor: FakeExtractor,
    ) -> (CrawlEngine<FakeClient, FakeExtractor>, MemorySink) {
        let sink = MemorySink::default();
        let log = ResponseLog::new(Box::new(sink.clone()), None).unwrap();
        (CrawlEngine::new(config, client, extractor, log), sink)
    }

    #[tokio::test]
    async fn test_link_reached_twice_is_fetched_once() {
        let client = FakeClient::default();
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://example.com/a", "http://example.com/b"])
            .page("http://example.com/a", &["http://example.com/shared", SEED])
            .page("http://example.com/b", &["http://example.com/shared"]);

        let (engine, _) = engine(config(), client.clone(), extractor);
        let report = engine.validate().await;

        assert_eq!(client.count("http://example.com/shared"), 1);
        assert_eq!(report.responses.len(), 4);
        assert!(!report.has_errors());
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let client = FakeClient::default();
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://example.com/a", "http://example.com/b"])
            .page("http://example.com/a", &["http://example.com/a1"]);

        let (engine, _) = engine(config(), client.clone(), extractor);
        engine.validate().await;

        assert_eq!(
            client.calls(),
            vec![
                "http://example.com/a",
                "http://example.com/a1",
                "http://example.com/b",
            ]
        );
    }

    #[tokio::test]
    async fn test_other_hosts_are_checked_but_not_crawled() {
        let client = FakeClient::default();
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://other.com/x", "http://sub.example.com/y"])
            .page("http://other.com/x", &["http://other.com/deeper"])
            .page("http://sub.example.com/y", &["http://sub.example.com/deeper"]);
        let expanded = extractor.expanded.clone();

        let (engine, _) = engine(config(), client.clone(), extractor);
        let report = engine.validate().await;

        assert_eq!(report.responses.len(), 2);
        assert_eq!(client.count("http://other.com/deeper"), 0);
        assert_eq!(*expanded.lock().unwrap(), vec![SEED.to_string()]);
    }

    #[tokio::test]
    async fn test_redirect_target_is_validated_with_original_referrer() {
        let client = FakeClient::default()
            .redirect("http://example.com/l", 301, "/m")
            .redirect("http://example.com/m", 302, "http://example.com/n");
        let extractor = FakeExtractor::default().page(SEED, &["http://example.com/l"]);

        let (engine, sink) = engine(config(), client.clone(), extractor);
        let report = engine.validate().await;

        assert_eq!(report.responses.get("http://example.com/l"), Some(Status::Code(301)));
        assert_eq!(report.responses.get("http://example.com/m"), Some(Status::Code(302)));
        assert_eq!(report.responses.get("http://example.com/n"), Some(Status::Code(200)));

        let lines = sink.lines();
        assert!(lines.contains(&(
            Severity::Warn,
            "302 - http://example.com/m - Called from: http://example.com/ - Following redirection to: http://example.com/n"
                .to_string()
        )));
        assert!(lines.contains(&(Severity::Info, "200 - http://example.com/n".to_string())));
    }

    #[tokio::test]
    async fn test_redirect_loop_terminates() {
        let client = FakeClient::default()
            .redirect("http://example.com/a", 302, "/b")
            .redirect("http://example.com/b", 302, "/a");
        let extractor = FakeExtractor::default().page(SEED, &["http://example.com/a"]);

        let (engine, _) = engine(config(), client.clone(), extractor);
        let report = engine.validate().await;

        assert_eq!(client.count("http://example.com/a"), 1);
        assert_eq!(client.count("http://example.com/b"), 1);
        assert_eq!(report.responses.len(), 2);
    }

    #[tokio::test]
    async fn test_refused_connection_is_recorded_and_siblings_continue() {
        let client = FakeClient::default()
            .fail("http://example.com/x", FetchError::ConnectionRefused)
            .fail(
                "http://example.com/y",
                FetchError::ConnectionProblems("timed out".to_string()),
            );
        let extractor = FakeExtractor::default().page(
            SEED,
            &["http://example.com/x", "http://example.com/y", "http://example.com/z"],
        );
        let expanded = extractor.expanded.clone();

        let (engine, sink) = engine(config(), client.clone(), extractor);
        let report = engine.validate().await;

        assert_eq!(report.responses.get("http://example.com/x"), Some(Status::ConnectionRefused));
        assert_eq!(report.responses.get("http://example.com/y"), Some(Status::ConnectionProblems));
        assert_eq!(report.responses.get("http://example.com/z"), Some(Status::Code(200)));
        assert_eq!(report.errors.len(), 2);

        // Unreachable pages aren't crawled into
        assert!(!expanded.lock().unwrap().contains(&"http://example.com/x".to_string()));

        assert!(sink.lines().contains(&(
            Severity::Error,
            "Unknown code Connection refused - http://example.com/x - Called from: http://example.com/"
                .to_string()
        )));
    }

    #[tokio::test]
    async fn test_unknown_failure_is_not_recorded_and_retried() {
        let client = FakeClient::default().fail(
            "http://example.com/bad",
            FetchError::Other("builder error".to_string()),
        );
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://example.com/bad", "http://example.com/ok"])
            .page("http://example.com/ok", &["http://example.com/bad"]);

        let (engine, sink) = engine(config(), client.clone(), extractor);
        let report = engine.validate().await;

        assert!(!report.responses.contains("http://example.com/bad"));
        assert!(report.responses.contains("http://example.com/ok"));
        assert_eq!(client.count("http://example.com/bad"), 2);
        assert!(sink.lines().contains(&(
            Severity::Error,
            "Unknown error builder error - http://example.com/bad - Called from: http://example.com/"
                .to_string()
        )));
    }

    #[tokio::test]
    async fn test_unparseable_location_is_an_unknown_error() {
        let client = FakeClient::default().redirect("http://example.com/odd", 302, "http://[::1");
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://example.com/odd", "http://example.com/next"]);

        let (engine, sink) = engine(config(), client.clone(), extractor);
        let report = engine.validate().await;

        // Not recorded, and the sibling is still visited
        assert!(!report.responses.contains("http://example.com/odd"));
        assert_eq!(client.count("http://example.com/next"), 1);

        let lines = sink.lines();
        assert!(lines.iter().any(|(severity, line)| {
            *severity == Severity::Error
                && line.starts_with("Unknown error invalid redirect 'http://[::1'")
                && line.ends_with("- http://example.com/odd - Called from: http://example.com/")
        }));
        assert!(!lines.iter().any(|(_, line)| line.starts_with("302 - ")));
    }

    #[tokio::test]
    async fn test_stylesheets_are_checked_but_not_crawled() {
        let client = FakeClient::default().status("http://example.com/missing.css", 404);
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://example.com/a"])
            .page("http://example.com/a", &[])
            .page("http://example.com/site.css", &["http://example.com/hidden"])
            .css(SEED, &["http://example.com/ignored.css"])
            .css(
                "http://example.com/a",
                &["http://example.com/site.css", "http://example.com/missing.css"],
            );
        let expanded = extractor.expanded.clone();

        let (engine, _) = engine(config().with_css(true), client.clone(), extractor);
        let report = engine.validate().await;

        assert_eq!(report.responses.get("http://example.com/site.css"), Some(Status::Code(200)));
        assert_eq!(report.errors.get("http://example.com/missing.css"), Some(Status::Code(404)));
        // Only pages reached through links have their stylesheets checked
        assert!(!report.responses.contains("http://example.com/ignored.css"));
        assert!(!expanded.lock().unwrap().contains(&"http://example.com/site.css".to_string()));
        assert_eq!(client.count("http://example.com/hidden"), 0);
    }

    #[tokio::test]
    async fn test_css_off_skips_stylesheets() {
        let client = FakeClient::default();
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://example.com/a"])
            .css("http://example.com/a", &["http://example.com/site.css"]);

        let (engine, _) = engine(config(), client.clone(), extractor);
        engine.validate().await;

        assert_eq!(client.count("http://example.com/site.css"), 0);
    }

    #[tokio::test]
    async fn test_error_report() {
        let client = FakeClient::default()
            .status("http://example.com/b", 404)
            .redirect("http://other.com/c", 301, "http://other.com/c2")
            .status("http://example.com/d", 503);
        let extractor = FakeExtractor::default().page(
            SEED,
            &[
                "http://example.com/a",
                "http://example.com/b",
                "http://other.com/c",
                "http://example.com/d",
            ],
        );

        let (engine, _) = engine(config(), client, extractor);
        let report = engine.validate().await;

        let errors: Vec<_> = report.errors.iter().collect();
        assert_eq!(
            errors,
            vec![
                ("http://example.com/b", Status::Code(404)),
                ("http://example.com/d", Status::Code(503)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_links() {
        let client = FakeClient::default();
        let extractor = FakeExtractor::default()
            .page(SEED, &["http://example.com/a", "http://example.com/b"]);

        let (engine, _) = engine(
            config().with_wait(Duration::from_secs(2)),
            client,
            extractor,
        );

        let started = tokio::time::Instant::now();
        engine.validate().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_relative_redirect() {
        assert_eq!(
            resolve_redirect("http://example.com/bar", "/foo").unwrap(),
            "http://example.com/foo"
        );
        assert_eq!(
            resolve_redirect("http://example.com/dir/bar", "baz").unwrap(),
            "http://example.com/dir/baz"
        );
    }

    #[test]
    fn test_resolve_absolute_redirect_verbatim() {
        assert_eq!(
            resolve_redirect("http://example.com/bar", "http://other.com/x").unwrap(),
            "http://other.com/x"
        );
        assert_eq!(
            resolve_redirect("http://example.com/bar", "http://other.com").unwrap(),
            "http://other.com"
        );
    }
}
