// In-memory record store with the same contract as SqliteStore.
// One mutex guards all three collections, so each call is atomic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DayShifts, RecordStore, StoreError, UpsertOutcome, WriteOutcome};
use crate::models::{DailyRollup, ShiftPatch, ShiftRecord};

#[derive(Default)]
struct State {
    shifts: BTreeMap<(String, u32), ShiftRecord>,
    revisions: BTreeMap<String, u64>,
    rollups: BTreeMap<String, (u64, DailyRollup)>,
}

impl State {
    fn bump_revision(&mut self, date: &str) -> u64 {
        let revision = self.revisions.entry(date.to_string()).or_insert(0);
        *revision += 1;
        *revision
    }

    fn count(&self, date: &str) -> u64 {
        self.day(date).count() as u64
    }

    fn day<'a>(&'a self, date: &'a str) -> impl Iterator<Item = &'a ShiftRecord> + 'a {
        self.shifts
            .range((date.to_string(), 0)..=(date.to_string(), u32::MAX))
            .map(|(_, r)| r)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn write_shift(&self, record: &ShiftRecord) -> Result<(WriteOutcome, u64), StoreError> {
        let mut state = self.state.lock().await;
        let key = (record.date.clone(), record.shift_index);
        let outcome = match state.shifts.insert(key, record.clone()) {
            Some(_) => WriteOutcome::Replaced,
            None => WriteOutcome::Inserted,
        };
        let revision = state.bump_revision(&record.date);
        Ok((outcome, revision))
    }

    async fn read_shift(
        &self,
        date: &str,
        shift_index: u32,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.shifts.get(&(date.to_string(), shift_index)).cloned())
    }

    async fn read_all_shifts(&self) -> Result<Vec<ShiftRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.shifts.values().cloned().collect())
    }

    async fn read_shifts(&self, date: &str) -> Result<DayShifts, StoreError> {
        let state = self.state.lock().await;
        Ok(DayShifts {
            revision: state.revisions.get(date).copied().unwrap_or(0),
            records: state.day(date).cloned().collect(),
        })
    }

    async fn update_shift(
        &self,
        date: &str,
        shift_index: u32,
        patch: ShiftPatch,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(record) = state.shifts.get_mut(&(date.to_string(), shift_index)) else {
            return Ok(None);
        };
        patch.apply(record);
        let updated = record.clone();
        state.bump_revision(date);
        Ok(Some(updated))
    }

    async fn delete_shift(&self, date: &str, shift_index: u32) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state
            .shifts
            .remove(&(date.to_string(), shift_index))
            .is_none()
        {
            return Ok(false);
        }
        state.bump_revision(date);
        Ok(true)
    }

    async fn count_shifts(&self, date: &str) -> Result<u64, StoreError> {
        Ok(self.state.lock().await.count(date))
    }

    async fn read_rollup(&self, date: &str) -> Result<Option<DailyRollup>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rollups.get(date).map(|(_, r)| r.clone()))
    }

    async fn rollup_revision(&self, date: &str) -> Result<Option<u64>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rollups.get(date).map(|(rev, _)| *rev))
    }

    async fn upsert_rollup(
        &self,
        rollup: &DailyRollup,
        revision: u64,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.state.lock().await;
        if state.revisions.get(&rollup.date) != Some(&revision) {
            return Ok(UpsertOutcome::Stale);
        }
        if let Some((stored, _)) = state.rollups.get(&rollup.date)
            && *stored > revision
        {
            return Ok(UpsertOutcome::Stale);
        }
        state
            .rollups
            .insert(rollup.date.clone(), (revision, rollup.clone()));
        Ok(UpsertOutcome::Written)
    }

    async fn retract_rollup(&self, date: &str, expected_shifts: u64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.count(date) == expected_shifts {
            return Ok(false);
        }
        Ok(state.rollups.remove(date).is_some())
    }

    async fn pending_dates(&self, expected_shifts: u64) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().await;
        let pending = state
            .revisions
            .iter()
            .filter(|(date, revision)| {
                let complete = state.count(date) == expected_shifts;
                match state.rollups.get(date.as_str()) {
                    Some((stored, _)) => !complete || stored < *revision,
                    None => complete,
                }
            })
            .map(|(date, _)| date.clone())
            .collect();
        Ok(pending)
    }
}
