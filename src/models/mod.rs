// Domain models: shift records in, daily rollups out

mod rollup;
mod shift;

pub use rollup::DailyRollup;
pub use shift::{
    AvailabilityMap, DATE_FORMAT, InputRejected, Numeric, ShiftPatch, ShiftRecord, UsageMap,
    UsageValue, validate_date,
};
