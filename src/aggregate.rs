//! Reassembles dispatch outcomes into ordered report rows.
//!
//! Outcomes arrive in completion order. The [`Aggregator`] slots each one
//! by candidate index and emits rows in the original candidate order once
//! the run is over, so the same feed snapshot always yields the same report.

use crate::dispatch::Dispatched;
use crate::model::{Candidate, QueryOutcome, ReportRow, RowStatus};
use futures::{Stream, StreamExt};
use tracing::warn;

pub struct Aggregator {
    slots: Vec<Option<QueryOutcome>>,
    recorded: usize,
}

impl Aggregator {
    /// Creates an aggregator expecting outcomes for `len` candidates.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            recorded: 0,
        }
    }

    /// Stores the outcome for candidate `index`.
    ///
    /// Returns false, keeping the earlier value, if the index is out of range
    /// or already has an outcome.
    pub fn record(&mut self, index: usize, outcome: QueryOutcome) -> bool {
        match self.slots.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(outcome);
                self.recorded += 1;
                true
            }
            Some(Some(_)) => {
                warn!(index, "Ignoring duplicate outcome");
                false
            }
            None => {
                warn!(index, expected = self.slots.len(), "Ignoring outcome for unknown candidate");
                false
            }
        }
    }

    /// Number of candidates with an outcome so far.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    pub fn is_complete(&self) -> bool {
        self.recorded == self.slots.len()
    }

    /// Emits rows in candidate order. Candidates without an outcome are
    /// left out.
    pub fn finish(self, candidates: &[Candidate]) -> Vec<ReportRow> {
        candidates
            .iter()
            .zip(self.slots)
            .filter_map(|(candidate, outcome)| outcome.map(|o| rows_for(candidate, &o)))
            .flatten()
            .collect()
    }
}

/// Turns one candidate's outcome into its report rows.
///
/// A found candidate yields one `FOUND` row per location. Anything else
/// yields exactly one row.
pub fn rows_for(candidate: &Candidate, outcome: &QueryOutcome) -> Vec<ReportRow> {
    let row = |status: RowStatus, repo: String, path: String| ReportRow {
        package: candidate.package.clone(),
        version: candidate.version.clone(),
        filename: candidate.filename.clone(),
        status,
        repo,
        path,
    };

    match outcome {
        QueryOutcome::Found(locations) => locations
            .iter()
            .map(|l| row(RowStatus::Found, l.repo.clone(), l.path.clone()))
            .collect(),
        QueryOutcome::NotFound => vec![row(RowStatus::NotFound, String::new(), String::new())],
        QueryOutcome::Failed(err) => vec![row(RowStatus::Error, err.to_string(), String::new())],
    }
}

/// Drains a dispatch stream and returns the ordered rows.
pub async fn aggregate<S>(candidates: &[Candidate], outcomes: S) -> Vec<ReportRow>
where
    S: Stream<Item = Dispatched>,
{
    let mut aggregator = Aggregator::new(candidates.len());
    let mut outcomes = std::pin::pin!(outcomes);
    while let Some(dispatched) = outcomes.next().await {
        aggregator.record(dispatched.index, dispatched.outcome);
    }
    aggregator.finish(candidates)
}
