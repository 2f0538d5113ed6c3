// src/checker/filter.rs
// =============================================================================
// Include/skip filtering of discovered links.
//
// - include patterns: if there are any, a link must match at least one
// - skip patterns: a link matching any of them is dropped
//
// The "i" variants (iinclude, iskip) are the same thing, matched
// case-insensitively. Patterns are regular expressions matched anywhere in
// the URL (use ^ and $ to anchor them).
// =============================================================================

use crate::config::PatternSet;
use crate::error::SetupError;
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    include: Vec<Regex>,
    skip: Vec<Regex>,
}

impl UrlFilter {
    pub fn new(patterns: &PatternSet) -> Result<Self, SetupError> {
        let include = compile_all(&patterns.include, false)?
            .into_iter()
            .chain(compile_all(&patterns.iinclude, true)?)
            .collect();

        let skip = compile_all(&patterns.skip, false)?
            .into_iter()
            .chain(compile_all(&patterns.iskip, true)?)
            .collect();

        Ok(Self { include, skip })
    }

    /// Whether a link should be validated.
    pub fn allows(&self, url: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| p.is_match(url)) {
            return false;
        }

        !self.skip.iter().any(|p| p.is_match(url))
    }
}

fn compile_all(patterns: &[String], case_insensitive: bool) -> Result<Vec<Regex>, SetupError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|source| SetupError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
        })
        .collect()
}
