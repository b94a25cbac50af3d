//! HopGraph Context Engine
//!
//! Builds the graph snapshot, then either evaluates a labelled dataset or
//! answers JSON reasoning requests read line by line from stdin.

use anyhow::Context as _;
use hopgraph_common::cache::{Cache, CacheConfig};
use hopgraph_common::config::{AppConfig, SnapshotSource};
use hopgraph_common::db::DbPool;
use hopgraph_common::errors::{AppError, ErrorDetails};
use hopgraph_common::metrics::{self, REASONING_BUCKETS, SNAPSHOT_BUCKETS};
use hopgraph_common::VERSION;
use hopgraph_context::{Evaluator, ReasoningCore, ReasoningEngine, ReasoningRequest};
use hopgraph_graph::{BackingStore, FileStore, SnapshotBuilder, SnapshotConfig, SnapshotHandle, SqlStore};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    info!("Starting HopGraph Context Engine v{}", VERSION);

    if config.observability.metrics_port != 0 {
        init_metrics(config.observability.metrics_port)?;
    }

    // Initial snapshot; the engine cannot run without one
    let store = open_store(&config).await?;
    let snapshot_config = SnapshotConfig::from_settings(&config.snapshot, &config.resolver)?;
    let builder = Arc::new(SnapshotBuilder::new(store, snapshot_config));
    let snapshot = builder.build().await.map_err(|e| {
        error!(error = %e, code = e.code().as_code(), "Initial snapshot build failed");
        e
    })?;
    let handle = Arc::new(SnapshotHandle::new(snapshot));

    let refresher = config
        .refresh_interval()
        .map(|interval| handle.spawn_refresh(Arc::clone(&builder), interval));

    let cache = if config.redis.enabled {
        match Cache::new(CacheConfig::from(&config.redis)).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "Response cache unavailable, continuing without it");
                None
            }
        }
    } else {
        None
    };

    let engine = ReasoningEngine::new(Arc::clone(&handle), config.reasoning.clone())?;
    info!("Context Engine ready");

    match config.evaluation.dataset_path.as_deref() {
        Some(path) => {
            let items = Evaluator::load_dataset(path).await?;
            let report = Evaluator::new(config.evaluation.clone()).evaluate(&engine, &items);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => {
            tokio::select! {
                result = serve_stdin(&engine, cache.as_ref()) => result?,
                _ = shutdown_signal() => {}
            }
        }
    }

    if let Some(task) = refresher {
        task.abort();
    }

    info!("Context Engine shutting down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    // stdout carries responses, so logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Suffix("reasoning_duration_seconds".to_string()), REASONING_BUCKETS)?
        .set_buckets_for_metric(Matcher::Suffix("snapshot_build_duration_seconds".to_string()), SNAPSHOT_BUCKETS)?
        .install()
        .context("Failed to install Prometheus exporter")?;

    metrics::register_metrics();
    info!(%addr, "Metrics exporter listening");
    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn BackingStore>> {
    match config.snapshot.source {
        SnapshotSource::Database => {
            info!("Connecting to database...");
            let db = DbPool::new(&config.database).await?;
            Ok(Arc::new(SqlStore::new(db)))
        }
        SnapshotSource::File => {
            let path = config
                .snapshot
                .file_path
                .as_deref()
                .context("snapshot.file_path is required when snapshot.source = \"file\"")?;
            Ok(Arc::new(FileStore::new(path)))
        }
    }
}

/// One JSON request per line in, one JSON response per line out
async fn serve_stdin(engine: &ReasoningEngine, cache: Option<&Cache>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<ReasoningRequest>(&line) {
            Ok(request) => {
                let result = match cache {
                    Some(cache) => engine.answer_cached(cache, &request).await,
                    None => engine.answer(&request),
                };
                match result {
                    Ok(response) => serde_json::to_string(&response)?,
                    Err(e) => serde_json::to_string(&ErrorDetails::from(&e))?,
                }
            }
            Err(e) => {
                let err = AppError::InvalidFormat {
                    message: format!("Invalid request: {}", e),
                };
                serde_json::to_string(&ErrorDetails::from(&err))?
            }
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
