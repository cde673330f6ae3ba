// Shift-completion aggregation: completeness check, pure reducer, and the
// trigger that ties them to the record store.

pub mod completeness;
pub mod reducer;
pub mod trigger;

pub use completeness::{Completeness, check_completeness};
pub use reducer::reduce;
pub use trigger::{AggregationError, AggregationOutcome, AggregationTrigger};
