//! Errors raised while querying the artifact repository.

use std::time::Duration;
use thiserror::Error;

/// Why a single repository query failed.
///
/// Values are cloneable and carry only owned strings so they can be stored
/// inside a [`QueryOutcome`](crate::model::QueryOutcome) and rendered into a
/// report row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The repository rejected the credential (401 or 403).
    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),

    /// The repository returned a 5xx status.
    #[error("server error (HTTP {0})")]
    Server(u16),

    /// The repository is throttling us (429).
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    /// Any other non-success status, e.g. a rejected query.
    #[error("unexpected status (HTTP {0})")]
    Status(u16),

    /// Connection, TLS or body transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within the per-call bound.
    #[error("timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    /// The body was not a search result document.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl QueryError {
    /// Returns true if another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueryError::Server(_)
                | QueryError::RateLimited
                | QueryError::Transport(_)
                | QueryError::Timeout(_)
                | QueryError::Malformed(_)
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, QueryError::Unauthorized(_))
    }

    /// Maps a non-success HTTP status to an error. Returns `None` for 2xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(QueryError::Unauthorized(status)),
            429 => Some(QueryError::RateLimited),
            500..=599 => Some(QueryError::Server(status)),
            _ => Some(QueryError::Status(status)),
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if let Some(mapped) = QueryError::from_status(status.as_u16()) {
                return mapped;
            }
        }
        if err.is_decode() {
            return QueryError::Malformed(err.to_string());
        }
        QueryError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_success() {
        assert_eq!(QueryError::from_status(200), None);
        assert_eq!(QueryError::from_status(204), None);
    }

    #[test]
    fn test_from_status_auth() {
        assert_eq!(QueryError::from_status(401), Some(QueryError::Unauthorized(401)));
        assert_eq!(QueryError::from_status(403), Some(QueryError::Unauthorized(403)));
    }

    #[test]
    fn test_from_status_other() {
        assert_eq!(QueryError::from_status(429), Some(QueryError::RateLimited));
        assert_eq!(QueryError::from_status(502), Some(QueryError::Server(502)));
        assert_eq!(QueryError::from_status(400), Some(QueryError::Status(400)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(QueryError::Server(503).is_retryable());
        assert!(QueryError::RateLimited.is_retryable());
        assert!(QueryError::Transport("reset".into()).is_retryable());
        assert!(QueryError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(QueryError::Malformed("eof".into()).is_retryable());

        assert!(!QueryError::Unauthorized(401).is_retryable());
        assert!(!QueryError::Status(400).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(QueryError::Unauthorized(403).to_string(), "unauthorized (HTTP 403)");
        assert_eq!(
            QueryError::Timeout(Duration::from_secs(30)).to_string(),
            "timed out after 30s"
        );
    }
}
