use serde::{Deserialize, Serialize};

/// One row of the threat feed, after CSV field splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRecord {
    pub package: String,
    /// Package ecosystem as named by the feed. Informational only.
    pub ecosystem: String,
    /// Raw version list, e.g. `["1.0.0||2.0.0"]`.
    pub versions: String,
    pub advisories: Vec<String>,
}

impl FeedRecord {
    pub fn new(package: impl Into<String>, versions: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ecosystem: String::new(),
            versions: versions.into(),
            advisories: Vec::new(),
        }
    }

    pub fn with_ecosystem(mut self, ecosystem: impl Into<String>) -> Self {
        self.ecosystem = ecosystem.into();
        self
    }

    pub fn with_advisories(mut self, advisories: Vec<String>) -> Self {
        self.advisories = advisories;
        self
    }
}

/// A package version to look for, with the artifact filename it would have.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub package: String,
    pub version: String,
    pub filename: String,
}

impl Candidate {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        let package = package.into();
        let version = version.into();
        let filename = derive_filename(&package, &version);
        Self {
            package,
            version,
            filename,
        }
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.package, self.version)
    }
}

/// Derives the tarball name a package version is published under.
///
/// Everything up to and including the last `/` is dropped, so
/// `@scope/name` becomes `name`. Distinct scopes can therefore collapse to
/// the same filename.
///
/// # Example
///
/// ```
/// use artifact_audit::model::derive_filename;
///
/// assert_eq!(derive_filename("@foo/bar", "1.0.0"), "bar-1.0.0.tgz");
/// assert_eq!(derive_filename("bar", "1.0.0"), "bar-1.0.0.tgz");
/// ```
pub fn derive_filename(package: &str, version: &str) -> String {
    let base = match package.rfind('/') {
        Some(pos) => &package[pos + 1..],
        None => package,
    };
    format!("{}-{}.tgz", base, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_filename_unscoped() {
        assert_eq!(derive_filename("lodash", "4.17.21"), "lodash-4.17.21.tgz");
    }

    #[test]
    fn test_derive_filename_scoped() {
        assert_eq!(derive_filename("@ctrl/tinycolor", "4.1.1"), "tinycolor-4.1.1.tgz");
    }

    #[test]
    fn test_derive_filename_last_segment_wins() {
        assert_eq!(derive_filename("@a/b/c", "1.0.0"), "c-1.0.0.tgz");
        assert_eq!(derive_filename("@a/b", "1.0.0"), derive_filename("@z/b", "1.0.0"));
    }

    #[test]
    fn test_candidate_new_derives_filename() {
        let candidate = Candidate::new("@foo/bar", "2.0.0");
        assert_eq!(candidate.package, "@foo/bar");
        assert_eq!(candidate.version, "2.0.0");
        assert_eq!(candidate.filename, "bar-2.0.0.tgz");
        assert_eq!(candidate.to_string(), "@foo/bar@2.0.0");
    }
}
