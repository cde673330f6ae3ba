// Write path: persist a shift mutation, then hand the date to the aggregation trigger.
// The mutation's result never depends on how aggregation went.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::aggregation::AggregationTrigger;
use crate::models::{DailyRollup, ShiftPatch, ShiftRecord};
use crate::store::{RecordStore, StoreError, WriteOutcome};

pub struct ShiftService {
    store: Arc<dyn RecordStore>,
    trigger: AggregationTrigger,
}

impl ShiftService {
    pub fn new(store: Arc<dyn RecordStore>, expected_shifts: u64) -> Self {
        let trigger = AggregationTrigger::new(store.clone(), expected_shifts);
        Self { store, trigger }
    }

    pub fn trigger(&self) -> &AggregationTrigger {
        &self.trigger
    }

    pub async fn record_shift(&self, record: &ShiftRecord) -> Result<WriteOutcome, StoreError> {
        let (outcome, revision) = self.store.write_shift(record).await?;
        debug!(date = %record.date, shift_index = record.shift_index, ?outcome, revision, "shift written");
        self.reevaluate(&record.date).await;
        Ok(outcome)
    }

    pub async fn update_shift(
        &self,
        date: &str,
        shift_index: u32,
        patch: ShiftPatch,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        let updated = self.store.update_shift(date, shift_index, patch).await?;
        if updated.is_some() {
            self.reevaluate(date).await;
        }
        Ok(updated)
    }

    pub async fn delete_shift(&self, date: &str, shift_index: u32) -> Result<bool, StoreError> {
        let deleted = self.store.delete_shift(date, shift_index).await?;
        if deleted {
            self.reevaluate(date).await;
        }
        Ok(deleted)
    }

    pub async fn read_shift(
        &self,
        date: &str,
        shift_index: u32,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        self.store.read_shift(date, shift_index).await
    }

    pub async fn read_all_shifts(&self) -> Result<Vec<ShiftRecord>, StoreError> {
        self.store.read_all_shifts().await
    }

    pub async fn read_rollup(&self, date: &str) -> Result<Option<DailyRollup>, StoreError> {
        self.store.read_rollup(date).await
    }

    /// Runs the trigger for `date`; failures are logged and left to reconciliation.
    async fn reevaluate(&self, date: &str) {
        match self.trigger.evaluate(date).await {
            Ok(outcome) => debug!(date, ?outcome, "aggregation evaluated"),
            Err(e) => {
                warn!(date, error = %e, "aggregation failed; will be retried by reconciliation")
            }
        }
    }
}
