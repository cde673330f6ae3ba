// Daily rollup: one row per date, the contract consumed by report rendering.
// Components missing from a max map had no numeric sample that day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AvailabilityMap, Numeric};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRollup {
    pub date: String,
    pub max_cpu_usage: BTreeMap<String, Numeric>,
    pub max_memory_usage: BTreeMap<String, Numeric>,
    pub application_availability: AvailabilityMap,
}

impl DailyRollup {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            max_cpu_usage: BTreeMap::new(),
            max_memory_usage: BTreeMap::new(),
            application_availability: AvailabilityMap::new(),
        }
    }
}
