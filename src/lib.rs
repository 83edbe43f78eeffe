pub mod aggregate;
pub mod audit;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod model;
pub mod output;
pub mod search;

pub use audit::Audit;
pub use cache::Cache;
pub use config::Config;
pub use error::QueryError;
pub use feed::{normalize, CandidateSet};
pub use model::{Candidate, QueryOutcome, Report, ReportRow, RowStatus};
