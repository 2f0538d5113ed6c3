// src/config.rs
// =============================================================================
// The settings for one validation run.
//
// A ValidationConfig is built once (usually from the command line, see
// cli.rs) and then handed to the crawl engine. Nothing changes it afterwards,
// and nothing else in the program holds crawl-wide settings.
//
// Rust concepts:
// - Builder methods: `with_*` functions that take `self` and return `Self`
// - Option<T>: For settings that may be absent (credentials, log file)
// =============================================================================

use crate::error::SetupError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Log file used when logging is switched on without an explicit path.
pub const DEFAULT_LOGFILE: &str = "linksweep_log.txt";

/// Delay between requests when none is given.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(3);

/// HTTP basic-auth credentials sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

// Include/skip patterns as the user typed them.
// They are compiled into regular expressions by checker::UrlFilter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    /// A URL must match one of these (if any are given)
    pub include: Vec<String>,
    /// Same as `include`, but matched case-insensitively
    pub iinclude: Vec<String>,
    /// A URL matching any of these is skipped
    pub skip: Vec<String>,
    /// Same as `skip`, but matched case-insensitively
    pub iskip: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Where the crawl starts. Already parsed, so it is percent-escaped.
    pub seed: Url,
    /// Pause after each link before moving on to the next one
    pub wait: Duration,
    /// Also validate `<link rel="stylesheet">` targets
    pub css: bool,
    /// Drop `#fragment` parts so `page#a` and `page#b` are one link
    pub ignore_fragments: bool,
    /// Never fetch links that live on another host
    pub local: bool,
    pub patterns: PatternSet,
    /// Some(path) when responses should also be written to a log file
    pub logfile: Option<PathBuf>,
    pub credentials: Option<Credentials>,
}

impl ValidationConfig {
    // Creates a config with default settings for the given seed URL
    //
    // Fails if the URL doesn't parse, isn't http(s), or has no host.
    pub fn new(seed: &str) -> Result<Self, SetupError> {
        let parsed = Url::parse(seed.trim()).map_err(|source| SetupError::InvalidUrl {
            url: seed.to_string(),
            source,
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(SetupError::UnsupportedScheme {
                url: seed.to_string(),
                scheme: parsed.scheme().to_string(),
            });
        }

        if parsed.host_str().is_none() {
            return Err(SetupError::MissingHost(seed.to_string()));
        }

        Ok(Self {
            seed: parsed,
            wait: DEFAULT_WAIT,
            css: false,
            ignore_fragments: false,
            local: false,
            patterns: PatternSet::default(),
            logfile: None,
            credentials: None,
        })
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_css(mut self, css: bool) -> Self {
        self.css = css;
        self
    }

    pub fn with_ignore_fragments(mut self, ignore_fragments: bool) -> Self {
        self.ignore_fragments = ignore_fragments;
        self
    }

    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    pub fn with_patterns(mut self, patterns: PatternSet) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_logfile(mut self, logfile: Option<PathBuf>) -> Self {
        self.logfile = logfile;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Host of the seed URL; links on this host are crawled recursively.
    pub fn seed_host(&self) -> &str {
        // new() refuses seeds without a host
        self.seed.host_str().unwrap_or_default()
    }
}
