use anyhow::Result;
use shift_rollup::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let store: Arc<dyn store::RecordStore> = if app_config.uses_in_memory_store() {
        tracing::warn!("database.path is :memory:; shift records will not survive a restart");
        Arc::new(store::MemoryStore::new())
    } else {
        let sqlite =
            store::SqliteStore::connect(&app_config.database.path, app_config.database.max_pool_size)
                .await?;
        sqlite.init().await?;
        Arc::new(sqlite)
    };

    let service = Arc::new(service::ShiftService::new(
        store.clone(),
        app_config.aggregation.expected_shifts_per_day,
    ));

    if app_config.aggregation.reconcile_on_startup {
        backfill::run_backfill(store.as_ref(), service.trigger()).await?;
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = reconcile_worker::spawn(
        store.clone(),
        service.trigger().clone(),
        reconcile_worker::ReconcileWorkerConfig {
            reconcile_interval_secs: app_config.aggregation.reconcile_interval_secs,
        },
        shutdown_rx,
    );

    let app = routes::app(service);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        expected_shifts = app_config.aggregation.expected_shifts_per_day,
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
