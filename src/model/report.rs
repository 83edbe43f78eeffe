use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    Found,
    NotFound,
    Error,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Found => "FOUND",
            RowStatus::NotFound => "NOT_FOUND",
            RowStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the audit report.
///
/// For `ERROR` rows `repo` holds the failure reason and `path` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub package: String,
    pub version: String,
    pub filename: String,
    pub status: RowStatus,
    pub repo: String,
    pub path: String,
}

/// Why a run stopped before every candidate was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "count")]
pub enum Interruption {
    /// The operator cancelled the run.
    Cancelled,
    /// The run gave up after this many consecutive authorization failures.
    AuthFailures(usize),
}

impl std::fmt::Display for Interruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interruption::Cancelled => write!(f, "cancelled by operator"),
            Interruption::AuthFailures(n) => {
                write!(f, "aborted after {} consecutive authorization failures", n)
            }
        }
    }
}

/// Complete (or partial) audit results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub total_candidates: usize,
    pub checked_candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<Interruption>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn new(rows: Vec<ReportRow>, total_candidates: usize, checked_candidates: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            total_candidates,
            checked_candidates,
            interrupted: None,
            rows,
        }
    }

    pub fn with_interruption(mut self, interruption: Option<Interruption>) -> Self {
        self.interrupted = interruption;
        self
    }

    /// True when some candidates were never checked.
    pub fn is_partial(&self) -> bool {
        self.interrupted.is_some() || self.checked_candidates < self.total_candidates
    }

    pub fn found_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| r.status == RowStatus::Found)
    }

    pub fn summary(&self) -> Summary {
        let mut found = HashSet::new();
        let mut summary = Summary {
            total_candidates: self.total_candidates,
            checked_candidates: self.checked_candidates,
            ..Summary::default()
        };

        for row in &self.rows {
            match row.status {
                RowStatus::Found => {
                    summary.found_artifacts += 1;
                    found.insert((row.package.as_str(), row.version.as_str()));
                }
                RowStatus::NotFound => summary.not_found += 1,
                RowStatus::Error => summary.errors += 1,
            }
        }

        summary.found_candidates = found.len();
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_candidates: usize,
    pub checked_candidates: usize,
    /// Candidates with at least one located artifact.
    pub found_candidates: usize,
    pub found_artifacts: usize,
    pub not_found: usize,
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(package: &str, version: &str, status: RowStatus) -> ReportRow {
        ReportRow {
            package: package.to_string(),
            version: version.to_string(),
            filename: format!("{}-{}.tgz", package, version),
            status,
            repo: String::new(),
            path: String::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let report = Report::new(
            vec![
                row("a", "1.0.0", RowStatus::Found),
                row("a", "1.0.0", RowStatus::Found),
                row("b", "1.0.0", RowStatus::NotFound),
                row("c", "1.0.0", RowStatus::Error),
            ],
            3,
            3,
        );

        let summary = report.summary();
        assert_eq!(summary.found_candidates, 1);
        assert_eq!(summary.found_artifacts, 2);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.errors, 1);
        assert!(!report.is_partial());
    }

    #[test]
    fn test_partial_when_unchecked_or_interrupted() {
        assert!(Report::new(Vec::new(), 2, 1).is_partial());
        assert!(Report::new(Vec::new(), 0, 0)
            .with_interruption(Some(Interruption::Cancelled))
            .is_partial());
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&RowStatus::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
    }
}
