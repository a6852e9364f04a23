//! LocalOps Worker Service
//!
//! Consumes approved runs from the Redis stream and executes them. Multiple
//! workers may run side by side; each run is processed by one consumer at a
//! time, and entries abandoned by a dead worker are reclaimed after an idle
//! threshold. Jobs are acknowledged only after `execute_run` returns, so a
//! crash mid-run leads to redelivery, which the orchestrator's re-entry
//! guard absorbs.

use lo_core::Settings;
use lo_storage::queue::RUNS_QUEUE;
use lo_storage::QueueClient;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod events;
mod report;
mod runner;
mod sandbox;
mod workspace;

use runner::RunExecutor;

/// How long a pending entry may sit idle before another worker claims it
const RECLAIM_IDLE_MS: u64 = 60_000;
/// Blocking read timeout per poll
const DEQUEUE_BLOCK_MS: usize = 5_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings);

    info!("Starting LocalOps Worker");

    // Counters (step failures) are registered even though the worker exposes
    // no scrape endpoint of its own; the recorder keeps them cheap no-ops
    // from the orchestrator's point of view.
    let _ = PrometheusBuilder::new().install_recorder();

    let db = lo_storage::pool::create_pool(&settings.database_url, 10, 2).await?;
    lo_storage::migrations::run_migrations(&db).await?;

    let queue = QueueClient::new(&settings.redis_url, "lo:queue:").await?;
    queue.init_queue(RUNS_QUEUE).await?;

    let consumer = format!("worker-{}", std::process::id());
    let executor = RunExecutor::new(db, settings);
    info!(consumer = %consumer, "Connected, consuming run queue");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping worker");
                break;
            }
            result = poll_once(&queue, &executor, &consumer) => {
                if let Err(e) = result {
                    error!(error = %e, "Queue poll failed, backing off");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    info!("Worker shutdown complete");
    Ok(())
}

/// One consume iteration: reclaim stale entries, then block for new ones.
async fn poll_once(
    queue: &QueueClient,
    executor: &RunExecutor,
    consumer: &str,
) -> Result<(), redis::RedisError> {
    let mut jobs = queue
        .claim_pending(RUNS_QUEUE, consumer, RECLAIM_IDLE_MS, 10)
        .await?;
    if jobs.is_empty() {
        jobs = queue
            .dequeue(RUNS_QUEUE, consumer, 1, DEQUEUE_BLOCK_MS)
            .await?;
    }

    for (stream_id, job) in jobs {
        info!(run_id = %job.run_id, stream_id = %stream_id, "Executing run");
        executor.execute_run(&job.run_id).await;
        if let Err(e) = queue.ack(RUNS_QUEUE, &stream_id).await {
            // The job will be redelivered; the re-entry guard makes that safe.
            warn!(stream_id = %stream_id, error = %e, "Failed to acknowledge job");
        }
    }
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));

    if settings.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
