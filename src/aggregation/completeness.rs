// Completeness: does the store hold exactly the expected number of shifts for a date?
// Always a fresh count; nothing is cached between calls.

use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completeness {
    pub count: u64,
    pub expected: u64,
    pub is_complete: bool,
}

impl Completeness {
    pub fn new(count: u64, expected: u64) -> Self {
        Self {
            count,
            expected,
            is_complete: count == expected,
        }
    }
}

pub async fn check_completeness(
    store: &dyn RecordStore,
    date: &str,
    expected: u64,
) -> Result<Completeness, StoreError> {
    let count = store.count_shifts(date).await?;
    Ok(Completeness::new(count, expected))
}
