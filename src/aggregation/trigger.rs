// Aggregation trigger: run after any shift mutation for a date.
// Holds no lock across read-reduce-write; duplicate runs converge on the
// date-keyed upsert, which only lands while the day is still at the revision
// that was read.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::completeness::check_completeness;
use super::reducer::reduce;
use crate::models::DailyRollup;
use crate::store::{RecordStore, StoreError, UpsertOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    /// Fewer (or more) shifts than expected; nothing was written.
    Incomplete { count: u64, expected: u64 },
    /// The day went incomplete after it had been aggregated; the outdated rollup was removed.
    Retracted { count: u64, expected: u64 },
    /// The stored rollup already reflects the current shift set.
    UpToDate,
    Aggregated(DailyRollup),
    /// The shift set changed between the read and the upsert; nothing was written.
    Superseded,
    /// Completeness flipped between the count and the read; retry-eligible.
    RaceDetected { expected: u64, found: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("persist rollup: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Clone)]
pub struct AggregationTrigger {
    store: Arc<dyn RecordStore>,
    expected_shifts: u64,
}

impl AggregationTrigger {
    pub fn new(store: Arc<dyn RecordStore>, expected_shifts: u64) -> Self {
        Self {
            store,
            expected_shifts,
        }
    }

    pub fn expected_shifts(&self) -> u64 {
        self.expected_shifts
    }

    /// Re-evaluates `date` from scratch and persists its rollup if the day is complete.
    #[instrument(skip(self), fields(expected = self.expected_shifts))]
    pub async fn evaluate(&self, date: &str) -> Result<AggregationOutcome, AggregationError> {
        let completeness = check_completeness(self.store.as_ref(), date, self.expected_shifts).await?;
        if !completeness.is_complete {
            return self.handle_incomplete(date, completeness.count).await;
        }

        let day = self.store.read_shifts(date).await?;
        let found = day.records.len() as u64;
        if found != self.expected_shifts {
            warn!(
                expected = self.expected_shifts,
                found, "shift count changed after completeness check; aggregation aborted"
            );
            return Ok(AggregationOutcome::RaceDetected {
                expected: self.expected_shifts,
                found,
            });
        }

        if self.store.rollup_revision(date).await? == Some(day.revision) {
            debug!(revision = day.revision, "rollup already up to date");
            return Ok(AggregationOutcome::UpToDate);
        }

        let rollup = reduce(date, &day.records);
        match self.store.upsert_rollup(&rollup, day.revision).await {
            Ok(UpsertOutcome::Written) => {
                info!(
                    revision = day.revision,
                    cpu_components = rollup.max_cpu_usage.len(),
                    memory_components = rollup.max_memory_usage.len(),
                    "daily rollup stored"
                );
                Ok(AggregationOutcome::Aggregated(rollup))
            }
            Ok(UpsertOutcome::Stale) => {
                debug!(revision = day.revision, "shift set changed before the upsert; rollup dropped");
                Ok(AggregationOutcome::Superseded)
            }
            Err(e) => {
                warn!(error = %e, "daily rollup upsert failed");
                Err(e.into())
            }
        }
    }

    async fn handle_incomplete(
        &self,
        date: &str,
        count: u64,
    ) -> Result<AggregationOutcome, AggregationError> {
        let expected = self.expected_shifts;
        // Common path: no rollup exists, so nothing to write or delete.
        if self.store.rollup_revision(date).await?.is_none() {
            return Ok(AggregationOutcome::Incomplete { count, expected });
        }
        // The store re-counts inside the delete; a day completed again in between keeps its rollup.
        if self.store.retract_rollup(date, expected).await? {
            info!(count, expected, "day no longer complete; rollup retracted");
            return Ok(AggregationOutcome::Retracted { count, expected });
        }
        Ok(AggregationOutcome::Incomplete { count, expected })
    }
}
