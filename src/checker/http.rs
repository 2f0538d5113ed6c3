// src/checker/http.rs
// =============================================================================
// This module talks HTTP.
//
// Key functionality:
// - Makes one GET request per link and reports the status code
// - Does NOT follow redirects: the crawl engine reads the Location header
//   itself so every hop in a redirect chain gets validated and logged
// - Sends HTTP basic auth with every request when credentials are set
// - Sorts network failures into "connection refused", "connection problems"
//   and "something else"
//
// The engine only sees the RequestClient trait, so tests can hand it a fake
// client instead of going over the network.
//
// Rust concepts:
// - Traits: RequestClient describes "something that can fetch a URL"
// - BoxFuture: A boxed async result, so the trait can be used as a seam
// - Error source chains: Walking `.source()` to find the underlying io::Error
// =============================================================================

use crate::config::Credentials;
use crate::error::SetupError;
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, RequestBuilder};
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Per-request timeout. A hanging server stalls the crawl for at most this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Why a fetch didn't produce a response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The host actively refused the connection
    #[error("Connection refused")]
    ConnectionRefused,

    /// Timeouts, resets, DNS/socket failures, malformed responses
    #[error("Connection problems: {0}")]
    ConnectionProblems(String),

    /// Anything we can't put in the two buckets above
    #[error("{0}")]
    Other(String),
}

/// Status line and redirect target of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Raw `Location` header value, if there was one
    pub location: Option<String>,
}

// Whether a Content-Type header value names an HTML document
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false)
}

/// Something that can GET a URL and report the status.
pub trait RequestClient: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>>;
}

// The real client, backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpClient {
    pub fn new(credentials: Option<Credentials>) -> Result<Self, SetupError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(redirect::Policy::none())
            .user_agent(concat!("linksweep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, credentials })
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, credentials.password.as_ref())
            }
            None => request,
        }
    }

    // Fetches the body of an HTML page
    //
    // The Content-Type header is checked before the body is read. Anything
    // that isn't HTML comes back as Ok(None) without downloading the body.
    pub async fn fetch_html(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self.request(url).send().await.map_err(categorize_error)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        if !is_html_content_type(content_type) {
            debug!(url, ?content_type, "Not HTML, body not read");
            return Ok(None);
        }

        let body = response.text().await.map_err(categorize_error)?;
        Ok(Some(body))
    }
}

impl RequestClient for HttpClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        async move {
            let response = self.request(url).send().await.map_err(categorize_error)?;

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            Ok(FetchResponse {
                status: response.status().as_u16(),
                location,
            })
        }
        .boxed()
    }
}

// Sorts a reqwest error into one of our three buckets
//
// reqwest errors can happen for many reasons:
// - The host refused the connection (nothing listening on the port)
// - Network timeout
// - DNS resolution failure, connection reset
// - The server sent something that isn't valid HTTP
// - The URL couldn't be turned into a request at all (builder errors)
fn categorize_error(error: reqwest::Error) -> FetchError {
    if is_connection_refused(&error) {
        FetchError::ConnectionRefused
    } else if error.is_timeout()
        || error.is_connect()
        || error.is_request()
        || error.is_body()
        || error.is_decode()
    {
        FetchError::ConnectionProblems(error.to_string())
    } else {
        FetchError::Other(error.to_string())
    }
}

// reqwest wraps the io::Error from the socket a few layers deep
fn is_connection_refused(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = err.source();
    }
    false
}
