//! garden-stock: cached stock feed for Grow a Garden.
//!
//! Single-binary Tokio application that:
//! 1. Keeps a browser-minted session cookie for the stock API
//! 2. Polls the stock, timer and image APIs on a fixed interval
//! 3. Normalizes the result into one snapshot
//! 4. Serves the latest good snapshot over HTTP with staleness metadata

mod config;
mod server;

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};

use session_client::{ChromiumDriver, LaunchOptions};
use snapshot::{CycleOutcome, FetchPipeline, RefreshCache};

/// Grow a Garden stock scraper
#[derive(Parser)]
#[command(name = "garden-stock", about = "Cached Grow a Garden stock feed")]
struct Cli {
    /// Path to the TOML config file (optional).
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single refresh cycle, print the snapshot as JSON, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "garden_stock=info,session_client=info,stock_client=info,snapshot=info,tower_http=info"
                    .into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let cfg = match config::load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Refresh every {}s, stale after {}s, session max age {}s (+{}s jitter)",
        cfg.timing.scrape_interval_secs,
        cfg.timing.stale_threshold_secs,
        cfg.session.max_age_secs,
        cfg.session.jitter_secs,
    );

    let driver = Arc::new(ChromiumDriver::new(LaunchOptions::from_config(
        &cfg.session,
        &cfg.sources.user_agent,
    )));
    let pipeline = match FetchPipeline::from_config(&cfg, driver) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to initialize fetch pipeline: {}", e);
            std::process::exit(1);
        }
    };
    let cache = Arc::new(RefreshCache::new(
        Arc::new(pipeline),
        Duration::from_secs(cfg.timing.stale_threshold_secs),
    ));

    if cli.once {
        run_once(&cache).await;
        return;
    }

    let refresh_handle =
        cache.spawn_refresh_loop(Duration::from_secs(cfg.timing.scrape_interval_secs));

    let state = Arc::new(server::AppState {
        cache: cache.clone(),
        started_at: Instant::now(),
    });
    let app = server::router(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Stock scraper listening on {}", addr);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = axum::serve(listener, app).into_future() => {
            error!("HTTP server exited: {:?}", r);
        }
        r = refresh_handle => {
            error!("Refresh task exited: {:?}", r);
        }
    }

    info!("Stock scraper shut down.");
}

async fn run_once(cache: &RefreshCache) {
    match cache.run_cycle().await {
        CycleOutcome::Updated { .. } => {}
        CycleOutcome::Empty => {
            error!("Refresh returned no items");
            std::process::exit(1);
        }
        CycleOutcome::Failed(e) => {
            error!("Refresh failed: {}", e);
            std::process::exit(1);
        }
        CycleOutcome::Skipped => {
            error!("Refresh skipped: another cycle was already running");
            std::process::exit(1);
        }
    }

    let Some(snapshot) = cache.snapshot().await else {
        error!("Refresh succeeded but no snapshot was cached");
        std::process::exit(1);
    };
    match serde_json::to_string_pretty(snapshot.as_ref()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            std::process::exit(1);
        }
    }
}
