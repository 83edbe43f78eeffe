//! Threat feed parsing and normalization.
//!
//! The feed is a CSV document with a header row and the columns
//! `package, ecosystem, versions, advisories`. Each row may name several
//! compromised versions in one `||`-delimited, bracket and quote wrapped
//! field. Normalization turns the feed into an ordered, deduplicated
//! [`CandidateSet`].
//!
//! # Example
//!
//! ```
//! use artifact_audit::feed::normalize;
//!
//! let feed = "package,type,versions,advisories\n\
//!             \"@foo/bar\",\"npm\",\"[\"\"1.0.0||2.0.0\"\"]\",\"XRAY-1\"\n";
//!
//! let candidates = normalize(feed);
//! let files: Vec<_> = candidates.iter().map(|c| c.filename.as_str()).collect();
//! assert_eq!(files, ["bar-1.0.0.tgz", "bar-2.0.0.tgz"]);
//! ```

pub mod csv;
mod fetch;

pub use fetch::FeedFetcher;

use crate::model::{Candidate, FeedRecord};
use std::collections::HashSet;
use tracing::debug;

/// Delimiter between versions in the version-list column.
const VERSION_DELIMITER: &str = "||";

/// Counters describing what normalization kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Data rows seen, excluding the header.
    pub rows: usize,
    /// Rows skipped for missing columns or an empty package name.
    pub dropped_rows: usize,
    /// Empty tokens in otherwise valid version lists.
    pub dropped_versions: usize,
    pub duplicates: usize,
}

/// Ordered candidates, unique on `(package, version)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    /// Builds a set from candidates, keeping the first of any duplicates.
    pub fn from_candidates(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        let mut set = Self::default();
        let mut seen = HashSet::new();
        for candidate in candidates {
            if seen.insert((candidate.package.clone(), candidate.version.clone())) {
                set.candidates.push(candidate);
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Keeps only candidates matching the predicate, preserving order.
    pub fn retain(&mut self, f: impl FnMut(&Candidate) -> bool) {
        self.candidates.retain(f);
    }

    /// Renders the set back into one feed record per candidate.
    pub fn to_records(&self) -> Vec<FeedRecord> {
        self.candidates
            .iter()
            .map(|c| FeedRecord::new(&c.package, format!("[\"{}\"]", c.version)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Normalizes raw feed text into candidates.
pub fn normalize(raw_feed: &str) -> CandidateSet {
    normalize_with_stats(raw_feed).0
}

/// Like [`normalize`], also reporting what was dropped.
pub fn normalize_with_stats(raw_feed: &str) -> (CandidateSet, NormalizeStats) {
    let (records, short_rows) = parse_feed(raw_feed);
    let (set, mut stats) = normalize_records(records);
    stats.rows += short_rows;
    stats.dropped_rows += short_rows;
    (set, stats)
}

/// Splits feed text into records, skipping the header.
///
/// Returns the records and the number of rows with too few columns.
pub fn parse_feed(raw_feed: &str) -> (Vec<FeedRecord>, usize) {
    let mut short_rows = 0;
    let mut records = Vec::new();

    for (record, fields) in csv::parse_records(raw_feed).into_iter().enumerate().skip(1) {
        if fields.len() < 3 {
            debug!(record, fields = fields.len(), "Dropping feed row with missing columns");
            short_rows += 1;
            continue;
        }

        let mut fields = fields.into_iter();
        let package = fields.next().unwrap_or_default();
        let ecosystem = fields.next().unwrap_or_default();
        let versions = fields.next().unwrap_or_default();
        let advisories: Vec<String> = fields
            .next()
            .map(|raw| {
                clean(&raw)
                    .split(',')
                    .map(|a| clean(a).to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        records.push(
            FeedRecord::new(package, versions)
                .with_ecosystem(clean(&ecosystem))
                .with_advisories(advisories),
        );
    }

    (records, short_rows)
}

/// Turns parsed records into candidates.
pub fn normalize_records(
    records: impl IntoIterator<Item = FeedRecord>,
) -> (CandidateSet, NormalizeStats) {
    let mut stats = NormalizeStats::default();
    let mut candidates = Vec::new();

    for record in records {
        stats.rows += 1;

        let package = clean_package(&record.package);
        if package.is_empty() {
            debug!(raw = %record.package, "Dropping feed row with empty package name");
            stats.dropped_rows += 1;
            continue;
        }

        let (versions, empty_tokens) = split_versions(&record.versions);
        stats.dropped_versions += empty_tokens;
        if versions.is_empty() {
            debug!(package = %package, "Dropping feed row with no versions");
            stats.dropped_rows += 1;
            continue;
        }

        for version in versions {
            candidates.push(Candidate::new(package.clone(), version));
        }
    }

    let total = candidates.len();
    let set = CandidateSet::from_candidates(candidates);
    stats.duplicates = total - set.len();

    (set, stats)
}

/// Strips quotes and whitespace from a package identifier. Scopes are kept.
pub fn clean_package(raw: &str) -> String {
    clean(raw).to_string()
}

/// Splits a version-list field into exact version strings.
///
/// Returns the versions in order and the number of empty tokens skipped.
pub fn split_versions(raw: &str) -> (Vec<String>, usize) {
    let inner = raw.trim_matches(|c: char| is_wrapper(c) || c == '[' || c == ']');
    if inner.is_empty() {
        return (Vec::new(), 0);
    }

    let mut empty = 0;
    let versions = inner
        .split(VERSION_DELIMITER)
        .filter_map(|token| {
            let token = clean(token);
            if token.is_empty() {
                empty += 1;
                None
            } else {
                Some(token.to_string())
            }
        })
        .collect();

    (versions, empty)
}

fn clean(raw: &str) -> &str {
    raw.trim_matches(is_wrapper)
}

fn is_wrapper(c: char) -> bool {
    c == '"' || c == '\'' || c.is_whitespace()
}
