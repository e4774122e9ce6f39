mod aggregator;
mod api;
mod config;
mod format;
mod models;
mod parser;
mod rpc;

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use crate::aggregator::Aggregator;
use crate::rpc::HttpLogSource;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Tip Aggregator starting...");

    // Load configuration
    let cfg = config::load()?;
    info!("Loaded config:");
    info!("  RPC URL: {}", cfg.rpc_http_url);
    info!("  Tipping contract: {}", cfg.tipping_address);
    info!("  Token decimals: {}", cfg.token_decimals);
    info!("  Conversion rate: {}", cfg.conversion_rate);
    info!("  Defaults: top {} / recent {}", cfg.top_n, cfg.recent_limit);
    info!("  Port: {}", cfg.port);

    let source = HttpLogSource::new(cfg.rpc_http_url.clone(), cfg.tipping_address)?;
    let aggregator = Arc::new(Aggregator::new(
        source,
        cfg.token_decimals,
        cfg.conversion_rate,
        cfg.block_lookup_concurrency,
    ));

    // Spawn API task
    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        let aggregator = Arc::clone(&aggregator);
        async move { api::serve(cfg, aggregator).await }
    });

    // Graceful shutdown
    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Tip Aggregator stopped.");
    Ok(())
}
