//! Video transcription worker binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};

use vscribe_providers::build_providers;
use vscribe_queue::{JobQueue, RedisQueue};
use vscribe_store::{JobStore, PostgresJobStore};
use vscribe_worker::{
    logging, metrics, FallbackOrchestrator, JobProcessor, WorkerConfig, WorkerPool, WorkerResult,
};

const QUEUE_LENGTH_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    logging::init_tracing();

    info!("Starting vscribe-worker");

    if let Err(e) = run().await {
        error!("Worker failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        metrics::init_metrics(addr)?;
        info!(%addr, "Prometheus exporter listening");
    }

    let queue = Arc::new(
        RedisQueue::from_env()
            .await
            .context("Failed to connect to Redis")?,
    );
    let store = Arc::new(
        PostgresJobStore::from_env()
            .await
            .context("Failed to connect to PostgreSQL")?,
    );

    check_readiness(queue.as_ref(), store.as_ref())
        .await
        .context("Readiness check failed")?;

    let providers =
        build_providers(&config.providers).context("Failed to build transcription providers")?;
    let orchestrator = Arc::new(FallbackOrchestrator::new(providers)?);
    info!(providers = ?orchestrator.provider_names(), "Transcription fallback order");
    let processor = Arc::new(JobProcessor::new(store.clone(), orchestrator));
    let pool = Arc::new(WorkerPool::new(
        queue.clone(),
        processor,
        config.pool_config(),
    ));

    let signal_pool = Arc::clone(&pool);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        signal_pool.shutdown();
    });

    let monitor = tokio::spawn(report_queue_length(queue.clone(), pool.subscribe()));

    pool.run().await?;
    monitor.await.ok();

    store.close().await;
    queue.close();
    info!(stats = ?pool.stats(), "Shutdown stats");
    Ok(())
}

/// Refuse to start unless both backends answer.
async fn check_readiness(queue: &dyn JobQueue, store: &dyn JobStore) -> WorkerResult<()> {
    queue.ping().await?;
    store.ping().await?;

    let pending = queue.len().await?;
    metrics::set_queue_length(pending);
    info!(pending, "Backends ready");
    Ok(())
}

async fn report_queue_length(queue: Arc<RedisQueue>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(QUEUE_LENGTH_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = interval.tick() => match queue.len().await {
                Ok(length) => metrics::set_queue_length(length),
                Err(e) => warn!(error = %e, "Failed to read queue length"),
            },
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
