// src/crawl/visited.rs
// =============================================================================
// The visited map: every link we've fetched, and what came back.
//
// It only ever grows. A link that is already in here is never fetched again,
// which is what stops the crawler from looping on pages that link to each
// other. A BTreeMap keeps the report sorted by URL.
// =============================================================================

use crate::report::Status;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VisitedMap {
    entries: BTreeMap<String, LinkRecord>,
}

impl VisitedMap {
    pub fn contains(&self, link: &str) -> bool {
        self.entries.contains_key(link)
    }

    // Records the status of a link. The first status recorded for a link wins.
    pub fn insert(&mut self, link: &str, status: Status) {
        self.entries
            .entry(link.to_string())
            .or_insert(LinkRecord { status });
    }

    #[cfg(test)]
    pub fn get(&self, link: &str) -> Option<Status> {
        self.entries.get(link).map(|record| record.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Status)> {
        self.entries
            .iter()
            .map(|(link, record)| (link.as_str(), record.status))
    }

    /// Entries whose status is outside 100..=399.
    pub fn errors(&self) -> VisitedMap {
        let entries = self
            .entries
            .iter()
            .filter(|(_, record)| record.status.is_error())
            .map(|(link, record)| (link.clone(), *record))
            .collect();

        VisitedMap { entries }
    }
}
