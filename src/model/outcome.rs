use crate::error::QueryError;
use serde::{Deserialize, Serialize};

/// Where an artifact was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Repository key, e.g. `npm-remote-cache`.
    pub repo: String,
    pub path: String,
}

impl Location {
    pub fn new(repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            path: path.into(),
        }
    }
}

/// Result of looking up one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// At least one artifact matched, in the order the repository returned them.
    Found(Vec<Location>),
    NotFound,
    Failed(QueryError),
}

impl QueryOutcome {
    /// Builds the outcome for a successful query.
    pub fn from_locations(locations: Vec<Location>) -> Self {
        if locations.is_empty() {
            QueryOutcome::NotFound
        } else {
            QueryOutcome::Found(locations)
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, QueryOutcome::Found(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, QueryOutcome::Failed(err) if err.is_unauthorized())
    }
}
