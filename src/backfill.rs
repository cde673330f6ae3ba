// One-time backfill: run one reconcile pass at startup so days completed while
// the service was down (or whose rollup write failed) get their rollup.

use tracing::info;

use crate::aggregation::AggregationTrigger;
use crate::reconcile_worker::{ReconcileReport, run_one_pass};
use crate::store::RecordStore;

pub async fn run_backfill(
    store: &dyn RecordStore,
    trigger: &AggregationTrigger,
) -> anyhow::Result<ReconcileReport> {
    let report = run_one_pass(store, trigger).await?;
    info!(pending = report.pending, "backfill complete");
    Ok(report)
}
