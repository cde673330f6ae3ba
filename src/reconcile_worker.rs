// Background worker: re-evaluate dates whose rollup disagrees with their shift set.
// Covers triggers that failed to persist; the trigger itself never retries.
// Runs every reconcile_interval_secs until the shutdown signal fires.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::aggregation::{AggregationOutcome, AggregationTrigger};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct ReconcileWorkerConfig {
    pub reconcile_interval_secs: u64,
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub pending: usize,
    pub aggregated: usize,
    pub retracted: usize,
    pub failed: usize,
}

/// Spawns the reconcile worker. Returns a join handle.
pub fn spawn(
    store: Arc<dyn RecordStore>,
    trigger: AggregationTrigger,
    config: ReconcileWorkerConfig,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(store, trigger, config, shutdown_rx).await;
    })
}

#[instrument(skip_all, fields(interval_secs = config.reconcile_interval_secs))]
async fn run(
    store: Arc<dyn RecordStore>,
    trigger: AggregationTrigger,
    config: ReconcileWorkerConfig,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.reconcile_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick fires immediately; startup backfill already covered it.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_one_pass(store.as_ref(), &trigger).await {
                    warn!(error = %e, "reconcile pass failed");
                }
            }
            _ = &mut shutdown_rx => {
                info!("reconcile worker shutting down");
                break;
            }
        }
    }
}

/// One pass over every pending date. Used by the worker loop and the startup backfill.
pub async fn run_one_pass(
    store: &dyn RecordStore,
    trigger: &AggregationTrigger,
) -> anyhow::Result<ReconcileReport> {
    let dates = store.pending_dates(trigger.expected_shifts()).await?;
    let mut report = ReconcileReport {
        pending: dates.len(),
        ..Default::default()
    };

    for date in &dates {
        match trigger.evaluate(date).await {
            Ok(AggregationOutcome::Aggregated(_)) => report.aggregated += 1,
            Ok(AggregationOutcome::Retracted { .. }) => report.retracted += 1,
            Ok(_) => {}
            Err(e) => {
                warn!(date = %date, error = %e, "reconcile: aggregation failed");
                report.failed += 1;
            }
        }
    }

    if report.pending > 0 {
        info!(
            pending = report.pending,
            aggregated = report.aggregated,
            retracted = report.retracted,
            failed = report.failed,
            "reconcile pass"
        );
    }
    Ok(report)
}
