//! Bounded-concurrency query dispatch.
//!
//! [`Dispatcher::dispatch`] issues one search per candidate with at most
//! `concurrency` calls in flight, applying a per-call timeout and the
//! [`RetryPolicy`]. Outcomes come back as a stream in completion order,
//! tagged with the candidate's position so they can be put back in order.
//!
//! # Example
//!
//! ```no_run
//! use artifact_audit::dispatch::{DispatchOptions, Dispatcher};
//! use artifact_audit::model::Candidate;
//! use artifact_audit::search::AqlSearch;
//! use futures::StreamExt;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let search = AqlSearch::new("https://acme.jfrog.io/artifactory", "token")?;
//!     let dispatcher = Dispatcher::new(Arc::new(search), DispatchOptions::default());
//!
//!     let candidates = vec![Candidate::new("@foo/bar", "1.0.0")];
//!     let mut outcomes = Box::pin(dispatcher.dispatch(&candidates, CancellationToken::new()));
//!     while let Some(dispatched) = outcomes.next().await {
//!         println!("{}: {:?}", candidates[dispatched.index], dispatched.outcome);
//!     }
//!     Ok(())
//! }
//! ```

mod retry;

pub use retry::RetryPolicy;

use crate::error::QueryError;
use crate::model::{Candidate, QueryOutcome};
use crate::search::ArtifactSearch;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tuning for a dispatch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Maximum number of calls in flight. Zero is treated as one.
    pub concurrency: usize,
    /// Upper bound on a single call. Exceeding it counts as a transport failure.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// An outcome tagged with the index of its candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub index: usize,
    pub outcome: QueryOutcome,
}

pub struct Dispatcher {
    search: Arc<dyn ArtifactSearch>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(search: Arc<dyn ArtifactSearch>, options: DispatchOptions) -> Self {
        Self { search, options }
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Queries every candidate and yields outcomes as they complete.
    ///
    /// Once `cancel` fires no further calls are started; calls already in
    /// flight run to completion (or time out) and are still yielded, so the
    /// stream may end with fewer items than `candidates`.
    pub fn dispatch<'a>(
        &'a self,
        candidates: &'a [Candidate],
        cancel: CancellationToken,
    ) -> impl Stream<Item = Dispatched> + 'a {
        let stop = cancel.clone().cancelled_owned();

        stream::iter(candidates.iter().enumerate())
            .take_until(stop)
            .map(move |(index, candidate)| {
                let cancel = cancel.clone();
                async move {
                    let outcome = self.query(candidate, &cancel).await;
                    Dispatched { index, outcome }
                }
            })
            .buffer_unordered(self.options.concurrency.max(1))
    }

    /// Looks up a single candidate with timeout and retries applied.
    pub async fn query(&self, candidate: &Candidate, cancel: &CancellationToken) -> QueryOutcome {
        let search = self.search.as_ref();
        let timeout = self.options.timeout;
        let filename = candidate.filename.as_str();

        debug!(filename, package = %candidate.package, "Querying repository");

        let result = self
            .options
            .retry
            .run(filename, cancel, move || async move {
                match tokio::time::timeout(timeout, search.find(filename)).await {
                    Ok(result) => result,
                    Err(_) => Err(QueryError::Timeout(timeout)),
                }
            })
            .await;

        match result {
            Ok(locations) => QueryOutcome::from_locations(locations),
            Err(err) => QueryOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted search backend for dispatcher and audit tests.

    use super::*;
    use crate::model::Location;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// What the fake returns for one filename, call by call.
    #[derive(Clone)]
    pub enum Reply {
        Locations(Vec<Location>),
        Fail(QueryError),
        /// Sleeps before answering with no results.
        Slow(Duration),
    }

    #[derive(Default)]
    pub struct FakeSearch {
        /// Replies per filename; the last reply repeats once the script runs out.
        script: Mutex<HashMap<String, Vec<Reply>>>,
        calls: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        /// Per-call delay so concurrent calls overlap.
        pub delay: Duration,
    }

    impl FakeSearch {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn script(self, filename: &str, replies: Vec<Reply>) -> Self {
            self.script
                .lock()
                .unwrap()
                .insert(filename.to_string(), replies);
            self
        }

        pub fn calls(&self, filename: &str) -> usize {
            self.calls.lock().unwrap().get(filename).copied().unwrap_or(0)
        }

        pub fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }

        fn next_reply(&self, filename: &str) -> Reply {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.entry(filename.to_string()).or_insert(0);
                *count += 1;
                *count
            };
            let script = self.script.lock().unwrap();
            match script.get(filename) {
                Some(replies) if !replies.is_empty() => {
                    replies[(call - 1).min(replies.len() - 1)].clone()
                }
                _ => Reply::Locations(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ArtifactSearch for FakeSearch {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn find(&self, filename: &str) -> Result<Vec<Location>, QueryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let reply = self.next_reply(filename);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = match reply {
                Reply::Locations(locations) => Ok(locations),
                Reply::Fail(err) => Err(err),
                Reply::Slow(d) => {
                    tokio::time::sleep(d).await;
                    Ok(Vec::new())
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }
}
