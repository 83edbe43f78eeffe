//! End-to-end audit of a candidate set against a repository.
//!
//! [`Audit::run`] drives the dispatcher, feeds outcomes to the aggregator,
//! and watches for two reasons to stop early: the caller's cancellation
//! token, and a run of consecutive authorization failures that means the
//! credential is no good.

use crate::aggregate::Aggregator;
use crate::dispatch::Dispatcher;
use crate::feed::CandidateSet;
use crate::model::{Candidate, Interruption, QueryOutcome, Report};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Consecutive authorization failures that abort a run by default.
pub const DEFAULT_AUTH_FAILURE_THRESHOLD: usize = 5;

pub struct Audit {
    dispatcher: Dispatcher,
    auth_failure_threshold: usize,
}

impl Audit {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            auth_failure_threshold: DEFAULT_AUTH_FAILURE_THRESHOLD,
        }
    }

    /// Sets how many consecutive authorization failures abort the run.
    /// Zero never aborts.
    pub fn with_auth_failure_threshold(mut self, threshold: usize) -> Self {
        self.auth_failure_threshold = threshold;
        self
    }

    /// Checks every candidate and returns the ordered report.
    ///
    /// `on_outcome` is called once per completed candidate, in completion
    /// order, e.g. to advance a progress bar. If `cancel` fires, or the
    /// authorization threshold is hit, the report holds only the candidates
    /// checked so far and is marked interrupted, even if every candidate
    /// ended up with a row.
    pub async fn run<F>(
        &self,
        candidates: &CandidateSet,
        cancel: CancellationToken,
        mut on_outcome: F,
    ) -> Report
    where
        F: FnMut(&Candidate, &QueryOutcome),
    {
        let slice = candidates.as_slice();
        let mut aggregator = Aggregator::new(slice.len());
        let mut consecutive_auth_failures = 0;
        let mut auth_abort = None;

        info!(
            candidates = slice.len(),
            concurrency = self.dispatcher.options().concurrency,
            "Starting repository audit"
        );

        let mut outcomes = std::pin::pin!(self.dispatcher.dispatch(slice, cancel.clone()));
        while let Some(dispatched) = outcomes.next().await {
            if dispatched.outcome.is_unauthorized() {
                consecutive_auth_failures += 1;
                if self.auth_failure_threshold > 0
                    && consecutive_auth_failures >= self.auth_failure_threshold
                    && auth_abort.is_none()
                {
                    error!(
                        failures = consecutive_auth_failures,
                        "Repository keeps rejecting the credential, aborting audit"
                    );
                    auth_abort = Some(Interruption::AuthFailures(consecutive_auth_failures));
                    cancel.cancel();
                }
            } else {
                consecutive_auth_failures = 0;
            }

            if let Some(candidate) = slice.get(dispatched.index) {
                on_outcome(candidate, &dispatched.outcome);
            }
            aggregator.record(dispatched.index, dispatched.outcome);
        }

        let checked = aggregator.recorded();
        // A cancel that lands during a final backoff still turns that query
        // into an ERROR row, so every candidate can look checked.
        let interruption =
            auth_abort.or_else(|| cancel.is_cancelled().then_some(Interruption::Cancelled));

        if let Some(reason) = &interruption {
            warn!(checked, total = slice.len(), %reason, "Audit stopped early");
        }

        Report::new(aggregator.finish(slice), slice.len(), checked).with_interruption(interruption)
    }
}
