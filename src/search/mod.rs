//! Repository search backends.
//!
//! The dispatcher talks to the repository through the [`ArtifactSearch`]
//! trait. [`AqlSearch`] implements it against Artifactory's AQL endpoint.

mod aql;

pub use aql::{build_query, AqlSearch};

use crate::error::QueryError;
use crate::model::Location;
use async_trait::async_trait;

/// Looks up artifacts by exact filename.
///
/// Implementations make exactly one remote call per invocation and leave
/// retries and timeouts to the caller.
#[async_trait]
pub trait ArtifactSearch: Send + Sync {
    /// Returns the human-readable name of this backend.
    fn name(&self) -> &'static str;

    /// Returns every artifact whose name equals `filename`, in the order the
    /// repository reports them. An empty vector means no match.
    async fn find(&self, filename: &str) -> Result<Vec<Location>, QueryError>;
}
