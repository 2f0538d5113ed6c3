// src/report/mod.rs
// =============================================================================
// Everything about presenting results.
//
// Submodules:
// - record: Status codes, severities and the log line format
// - log: The response log (leveled sink + optional log file)
//
// This file holds the final Report handed back by a validation run.
// =============================================================================

mod log;
mod record;

pub use log::{ResponseLog, TracingSink};
pub use record::{ResponseRecord, Status};

#[cfg(test)]
pub use log::MemorySink;
#[cfg(test)]
pub use record::Severity;

use crate::crawl::VisitedMap;
use serde::Serialize;

// The result of a validation run
//
// `responses` holds every link that was fetched, `errors` the subset whose
// status is outside 100..=399.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub responses: VisitedMap,
    pub errors: VisitedMap,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl From<VisitedMap> for Report {
    fn from(responses: VisitedMap) -> Self {
        let errors = responses.errors();
        Self { responses, errors }
    }
}
