// src/report/record.rs
// =============================================================================
// What we learned about one link, and how it gets turned into a log line.
//
// Every fetch produces a status: either the HTTP status code the server sent
// back, or a sentinel saying the connection itself failed. The status decides
// the severity of the log line:
//
//   1xx, 2xx  -> info
//   3xx       -> warn
//   4xx, 5xx  -> error
//   anything else (including the sentinels) -> error, "Unknown code ..."
//
// Line format:
//   "<code> - <link>"
//   + " - Called from: <page>"               when the code isn't exactly 200
//   + " - Following redirection to: <url>"   when the server redirected us
// =============================================================================

use serde::{Serialize, Serializer};
use std::fmt;

/// Outcome of a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The server answered with this HTTP status code
    Code(u16),
    /// The host actively refused the connection
    ConnectionRefused,
    /// Timeouts, resets, DNS failures, malformed responses
    ConnectionProblems,
}

impl Status {
    // Numeric view of the status. Sentinels have no code and count as 0,
    // which places them outside every known class.
    pub fn numeric(&self) -> u16 {
        match self {
            Status::Code(code) => *code,
            Status::ConnectionRefused | Status::ConnectionProblems => 0,
        }
    }

    /// True for anything outside 100..=399, i.e. what ends up in the error report.
    pub fn is_error(&self) -> bool {
        !(100..=399).contains(&self.numeric())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Code(code) => write!(f, "{}", code),
            Status::ConnectionRefused => f.write_str("Connection refused"),
            Status::ConnectionProblems => f.write_str("Connection problems"),
        }
    }
}

// Codes serialize as numbers, sentinels as their text
impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Status::Code(code) => serializer.serialize_u16(*code),
            other => serializer.collect_str(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// One classified response, ready to be logged.
#[derive(Debug, Clone, Copy)]
pub struct ResponseRecord<'a> {
    pub status: Status,
    pub link: &'a str,
    /// The page the link was found on
    pub from: &'a str,
    pub redirect: Option<&'a str>,
}

impl<'a> ResponseRecord<'a> {
    // The plain log line, as written to the log file
    pub fn message(&self) -> String {
        let mut message = format!("{} - {}", self.status, self.link);

        if self.status.numeric() != 200 {
            message.push_str(&format!(" - Called from: {}", self.from));
        }

        if let Some(target) = self.redirect {
            message.push_str(&format!(" - Following redirection to: {}", target));
        }

        message
    }

    pub fn severity(&self) -> Severity {
        match self.status.numeric() / 100 {
            1 | 2 => Severity::Info,
            3 => Severity::Warn,
            _ => Severity::Error,
        }
    }

    /// Whether the status falls outside the 1xx-5xx classes.
    pub fn is_unknown_code(&self) -> bool {
        !(1..=5).contains(&(self.status.numeric() / 100))
    }

    // The line sent to the leveled sink: same as message(), with
    // "Unknown code " in front when the status has no known class
    pub fn leveled_message(&self) -> String {
        if self.is_unknown_code() {
            format!("Unknown code {}", self.message())
        } else {
            self.message()
        }
    }
}
