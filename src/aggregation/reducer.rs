// Pure reduction of one day's shift records into a DailyRollup.
// cpu/memory: per-component max over numeric samples only (order-insensitive).
// availability: first value per key wins, walking shifts by ascending shift_index.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::models::{AvailabilityMap, DailyRollup, Numeric, ShiftRecord, UsageMap};

/// Folds `records` (all shifts of `date`, any order) into the day's rollup.
pub fn reduce(date: &str, records: &[ShiftRecord]) -> DailyRollup {
    let mut ordered: Vec<&ShiftRecord> = records.iter().collect();
    // Stable sort: equal indices keep the order they were supplied in.
    ordered.sort_by_key(|r| r.shift_index);

    let mut rollup = DailyRollup::empty(date);
    for record in ordered {
        fold_max(&mut rollup.max_cpu_usage, &record.cpu_usage, "cpu");
        fold_max(&mut rollup.max_memory_usage, &record.memory_usage, "memory");
        fold_first(
            &mut rollup.application_availability,
            &record.application_availability,
        );
    }
    rollup
}

fn fold_max(acc: &mut BTreeMap<String, Numeric>, usage: &UsageMap, field: &'static str) {
    for (component, value) in usage {
        let Some(n) = value.numeric() else {
            continue;
        };
        if !n.is_comparable() {
            tracing::debug!(field, component = %component, "skipping unordered usage value");
            continue;
        }
        match acc.entry(component.clone()) {
            Entry::Vacant(e) => {
                e.insert(n);
            }
            Entry::Occupied(mut e) => {
                if n > *e.get() {
                    e.insert(n);
                }
            }
        }
    }
}

fn fold_first(acc: &mut AvailabilityMap, availability: &AvailabilityMap) {
    for (component, value) in availability {
        acc.entry(component.clone())
            .or_insert_with(|| value.clone());
    }
}
