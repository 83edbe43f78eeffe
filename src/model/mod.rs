//! Core data types that flow through an audit.
//!
//! Each stage of the pipeline turns one immutable value into the next:
//!
//! - [`FeedRecord`] - A raw row of the threat feed
//! - [`Candidate`] - A package version and the filename it would have
//! - [`QueryOutcome`] - What the repository said about a candidate
//! - [`ReportRow`] / [`Report`] - The reconciled results
//!
//! # Example
//!
//! ```
//! use artifact_audit::model::{Candidate, Location, QueryOutcome};
//!
//! let candidate = Candidate::new("@foo/bar", "1.0.0");
//! assert_eq!(candidate.filename, "bar-1.0.0.tgz");
//!
//! let outcome = QueryOutcome::from_locations(vec![Location::new("npm-local", "bar/-/bar-1.0.0.tgz")]);
//! assert!(outcome.is_found());
//! ```

mod candidate;
mod outcome;
mod report;

pub use candidate::*;
pub use outcome::*;
pub use report::*;
