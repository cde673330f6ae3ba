// Record store: shift records keyed by (date, shift_index), rollups keyed by date.
// Every shift mutation bumps the date's revision in the same transaction, and
// every persisted rollup remembers the revision it was computed from.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::models::{DailyRollup, ShiftPatch, ShiftRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode/decode stored document: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of writing a shift record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Replaced,
}

/// Result of a revision-conditional rollup upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Written,
    /// The shift set changed after the rollup was computed; nothing changed.
    Stale,
}

/// All shift records for one date, read together with the date's revision.
#[derive(Debug, Clone, PartialEq)]
pub struct DayShifts {
    pub revision: u64,
    /// Ascending `shift_index`.
    pub records: Vec<ShiftRecord>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts or replaces the record at `(date, shift_index)`. Returns the new day revision.
    async fn write_shift(&self, record: &ShiftRecord) -> Result<(WriteOutcome, u64), StoreError>;

    async fn read_shift(
        &self,
        date: &str,
        shift_index: u32,
    ) -> Result<Option<ShiftRecord>, StoreError>;

    /// Every stored shift record, ordered by date then shift index.
    async fn read_all_shifts(&self) -> Result<Vec<ShiftRecord>, StoreError>;

    async fn read_shifts(&self, date: &str) -> Result<DayShifts, StoreError>;

    /// Applies `patch` to an existing record. `None` when no record matched.
    async fn update_shift(
        &self,
        date: &str,
        shift_index: u32,
        patch: ShiftPatch,
    ) -> Result<Option<ShiftRecord>, StoreError>;

    /// `true` when a record was deleted.
    async fn delete_shift(&self, date: &str, shift_index: u32) -> Result<bool, StoreError>;

    async fn count_shifts(&self, date: &str) -> Result<u64, StoreError>;

    async fn read_rollup(&self, date: &str) -> Result<Option<DailyRollup>, StoreError>;

    /// Revision the stored rollup for `date` was computed from, if any.
    async fn rollup_revision(&self, date: &str) -> Result<Option<u64>, StoreError>;

    /// Insert-or-replace keyed by date. Writes only while `revision` is still the
    /// day's current revision, so a rollup of a superseded shift set never lands.
    async fn upsert_rollup(
        &self,
        rollup: &DailyRollup,
        revision: u64,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Deletes the rollup for `date` if the day does not hold exactly
    /// `expected_shifts` records at the time of the delete.
    async fn retract_rollup(&self, date: &str, expected_shifts: u64) -> Result<bool, StoreError>;

    /// Dates whose stored rollup disagrees with their shift set: complete days
    /// with a missing or outdated rollup, and incomplete days that still have one.
    async fn pending_dates(&self, expected_shifts: u64) -> Result<Vec<String>, StoreError>;
}
