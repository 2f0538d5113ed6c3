// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use clap's "derive" API: the Cli struct below *is* the CLI, and each
// field becomes an argument or a flag.
//
// The parsed Cli is turned into a ValidationConfig (see config.rs) before the
// crawl starts; nothing else in the program reads the command line.
// =============================================================================

use crate::config::{Credentials, PatternSet, ValidationConfig, DEFAULT_LOGFILE};
use crate::error::SetupError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "linksweep",
    version,
    about = "Crawl a website and report broken links",
    long_about = "linksweep starts at a URL, follows every link on the same host, and checks \
                  that each link (including links to other sites) answers with a healthy status. \
                  It exits with code 1 when broken links are found, which makes it handy in CI."
)]
pub struct Cli {
    /// Website URL to start from (e.g., https://example.com)
    pub url: String,

    /// Username for HTTP basic auth
    #[arg(long)]
    pub username: Option<String>,

    /// Password for HTTP basic auth
    #[arg(long)]
    pub password: Option<String>,

    /// Seconds to wait between requests (fractions allowed)
    #[arg(long, default_value = "3", value_parser = parse_wait, value_name = "SECS")]
    pub wait: Duration,

    /// Also check <link rel="stylesheet"> targets
    #[arg(long)]
    pub css: bool,

    /// Treat page#a and page#b as the same link
    #[arg(long)]
    pub ignore_fragments: bool,

    /// Only check links on the starting host
    #[arg(long)]
    pub local: bool,

    /// Only check links matching this regex (repeatable)
    #[arg(long, value_name = "REGEX")]
    pub include: Vec<String>,

    /// Like --include, but case-insensitive
    #[arg(long, value_name = "REGEX")]
    pub iinclude: Vec<String>,

    /// Skip links matching this regex (repeatable)
    #[arg(long, value_name = "REGEX")]
    pub skip: Vec<String>,

    /// Like --skip, but case-insensitive
    #[arg(long, value_name = "REGEX")]
    pub iskip: Vec<String>,

    /// Write every response to this file (implies --log)
    #[arg(long, value_name = "PATH")]
    pub logfile: Option<PathBuf>,

    /// Write every response to a log file (linksweep_log.txt unless --logfile is given)
    #[arg(long)]
    pub log: bool,

    /// Output the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// More console output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print errors to the console
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    // Builds the run's configuration from the parsed arguments
    pub fn to_config(&self) -> Result<ValidationConfig, SetupError> {
        // Giving a log file implies logging
        let logfile = match (&self.logfile, self.log) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(PathBuf::from(DEFAULT_LOGFILE)),
            (None, false) => None,
        };

        let credentials = if self.username.is_some() || self.password.is_some() {
            Some(Credentials {
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone(),
            })
        } else {
            None
        };

        Ok(ValidationConfig::new(&self.url)?
            .with_wait(self.wait)
            .with_css(self.css)
            .with_ignore_fragments(self.ignore_fragments)
            .with_local(self.local)
            .with_patterns(PatternSet {
                include: self.include.clone(),
                iinclude: self.iinclude.clone(),
                skip: self.skip.clone(),
                iskip: self.iskip.clone(),
            })
            .with_logfile(logfile)
            .with_credentials(credentials))
    }

    // Default console level: -q > -v > info. RUST_LOG overrides all of them.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

// Parses --wait. Negative, NaN and infinite values are refused rather than
// being turned into some other delay.
fn parse_wait(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("'{}' must be a finite, non-negative number of seconds", value));
    }

    Duration::try_from_secs_f64(secs).map_err(|e| format!("'{}' is out of range: {}", value, e))
}
