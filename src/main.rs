use anyhow::Context;
use axum::Router;
use clap::Parser;
use peer_search::config::NodeConfig;
use peer_search::index::segment::Segment;
use peer_search::indexing::handlers as indexing_handlers;
use peer_search::indexing::pipeline::IndexingPipeline;
use peer_search::peers::registry::PeerRegistry;
use peer_search::replication::auth::NetworkAuth;
use peer_search::replication::handlers as replication_handlers;
use peer_search::replication::receiver::IndexReceiver;
use peer_search::replication::transfer_log::TransferLog;
use peer_search::workflow::accounting::ProcessMemory;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = NodeConfig::parse();
    let local = config.local_peer();

    tracing::info!("Starting peer {} on network '{}'", local, config.network);
    if config.robinson {
        tracing::info!("Robinson mode: remote index transfers are refused");
    }

    // 1. Local index:
    let segment = Arc::new(Segment::new(config.ram_limit, config.url_capacity));

    // 2. Indexing pipeline:
    let pipeline = Arc::new(IndexingPipeline::spawn(
        segment.clone(),
        config.pipeline(),
        Arc::new(ProcessMemory::new()),
    ));

    // 3. DHT receiver:
    let policy = config
        .receive_policy()
        .context("invalid --blacklist pattern")?;
    let peers = Arc::new(PeerRegistry::new(local));
    let receiver = Arc::new(IndexReceiver::new(
        policy,
        segment.clone(),
        peers.clone(),
        Arc::new(TransferLog::default()),
    ));
    let auth = Arc::new(NetworkAuth::new(
        config.network.clone(),
        config.network_secret.clone(),
    ));

    // 4. HTTP Router:
    let app = Router::new()
        .merge(replication_handlers::routes(auth, receiver))
        .merge(indexing_handlers::routes(pipeline.clone(), segment.clone()));

    // 5. Spawn stats reporter:
    let stats_segment = segment.clone();
    let stats_pipeline = pipeline.clone();
    let stats_peers = peers.clone();
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let index = stats_segment.stats();
            tracing::info!(
                "Index stats: {} words, {} references, {} urls, {} frozen segments, {} peers",
                index.words,
                index.references,
                index.urls,
                index.frozen_segments,
                stats_peers.len()
            );
            for stage in stats_pipeline.stats() {
                tracing::debug!(
                    "  - stage '{}': processed={} failed={} queue={} avg_mem={}",
                    stage.name,
                    stage.processed,
                    stage.failed,
                    stage.queue_len,
                    stage.average_memory
                );
            }
        }
    });

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. Drain:
    reporter.abort();
    pipeline.shutdown().await;
    pipeline.join().await;
    segment.words().flush().context("final index flush failed")?;
    tracing::info!("Final index stats: {:?}", segment.stats());
    segment.close();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
