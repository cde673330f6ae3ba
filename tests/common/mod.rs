// Shared test helpers
#![allow(dead_code)]

use async_trait::async_trait;
use shift_rollup::models::*;
use shift_rollup::store::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

pub const DAY: &str = "2024-01-01";

/// The three shifts from the api/db example day.
pub fn example_day() -> Vec<ShiftRecord> {
    vec![
        ShiftRecord::new(DAY, 1)
            .with_cpu("api", 2)
            .with_memory("db", "unknown")
            .with_availability("svc", "up"),
        ShiftRecord::new(DAY, 2)
            .with_cpu("api", 5)
            .with_memory("db", 128)
            .with_availability("svc", "down"),
        ShiftRecord::new(DAY, 3)
            .with_cpu("api", 3)
            .with_memory("db", 64)
            .with_availability("web", "up"),
    ]
}

/// Fresh SQLite store in a temp dir; keep the TempDir alive for the test.
pub async fn sqlite_store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shifts.db");
    let store = SqliteStore::connect(path.to_str().unwrap(), 4)
        .await
        .unwrap();
    store.init().await.unwrap();
    (dir, store)
}

/// A shift mutation that lands right after `read_shifts` hands the day to a trigger.
pub enum AfterRead {
    Delete { date: String, shift_index: u32 },
    Write(ShiftRecord),
}

/// MemoryStore wrapper with switchable faults.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub fail_upsert: AtomicBool,
    /// `read_shifts` drops the last record, as if deleted right after the count.
    pub lose_one_on_read: AtomicBool,
    /// Applied once, after the next `read_shifts` returns its snapshot.
    pub after_read: Mutex<Option<AfterRead>>,
}

impl FaultyStore {
    pub fn set_fail_upsert(&self, on: bool) {
        self.fail_upsert.store(on, Ordering::SeqCst);
    }

    pub fn set_lose_one_on_read(&self, on: bool) {
        self.lose_one_on_read.store(on, Ordering::SeqCst);
    }

    pub fn mutate_after_next_read(&self, mutation: AfterRead) {
        *self.after_read.lock().unwrap() = Some(mutation);
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn write_shift(&self, record: &ShiftRecord) -> Result<(WriteOutcome, u64), StoreError> {
        self.inner.write_shift(record).await
    }

    async fn read_shift(
        &self,
        date: &str,
        shift_index: u32,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        self.inner.read_shift(date, shift_index).await
    }

    async fn read_all_shifts(&self) -> Result<Vec<ShiftRecord>, StoreError> {
        self.inner.read_all_shifts().await
    }

    async fn read_shifts(&self, date: &str) -> Result<DayShifts, StoreError> {
        let mut day = self.inner.read_shifts(date).await?;
        if self.lose_one_on_read.load(Ordering::SeqCst) {
            day.records.pop();
        }
        let mutation = self.after_read.lock().unwrap().take();
        match mutation {
            Some(AfterRead::Delete { date, shift_index }) => {
                self.inner.delete_shift(&date, shift_index).await?;
            }
            Some(AfterRead::Write(record)) => {
                self.inner.write_shift(&record).await?;
            }
            None => {}
        }
        Ok(day)
    }

    async fn update_shift(
        &self,
        date: &str,
        shift_index: u32,
        patch: ShiftPatch,
    ) -> Result<Option<ShiftRecord>, StoreError> {
        self.inner.update_shift(date, shift_index, patch).await
    }

    async fn delete_shift(&self, date: &str, shift_index: u32) -> Result<bool, StoreError> {
        self.inner.delete_shift(date, shift_index).await
    }

    async fn count_shifts(&self, date: &str) -> Result<u64, StoreError> {
        self.inner.count_shifts(date).await
    }

    async fn read_rollup(&self, date: &str) -> Result<Option<DailyRollup>, StoreError> {
        self.inner.read_rollup(date).await
    }

    async fn rollup_revision(&self, date: &str) -> Result<Option<u64>, StoreError> {
        self.inner.rollup_revision(date).await
    }

    async fn upsert_rollup(
        &self,
        rollup: &DailyRollup,
        revision: u64,
    ) -> Result<UpsertOutcome, StoreError> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected upsert failure".into()));
        }
        self.inner.upsert_rollup(rollup, revision).await
    }

    async fn retract_rollup(&self, date: &str, expected_shifts: u64) -> Result<bool, StoreError> {
        self.inner.retract_rollup(date, expected_shifts).await
    }

    async fn pending_dates(&self, expected_shifts: u64) -> Result<Vec<String>, StoreError> {
        self.inner.pending_dates(expected_shifts).await
    }
}
