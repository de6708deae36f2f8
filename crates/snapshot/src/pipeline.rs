//! One fetch cycle: session check, three concurrent fetches, normalize.

use std::sync::Arc;

use async_trait::async_trait;
use common::{Error, ImageIndex, NormalizedSnapshot, RawStockResponse, ScraperConfig, TimerSet};
use session_client::{BrowserDriver, SessionManager};
use stock_client::{ImageClient, StockApiClient, TimerClient};
use tracing::info;

use crate::normalize::normalize;

/// Anything that can produce a fresh snapshot.
#[async_trait]
pub trait StockSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<NormalizedSnapshot, Error>;
}

/// The production source: browser session + stock, timer and image APIs.
#[derive(Debug)]
pub struct FetchPipeline {
    session: Arc<SessionManager>,
    stock: StockApiClient,
    timers: TimerClient,
    images: ImageClient,
}

impl FetchPipeline {
    pub fn new(
        session: Arc<SessionManager>,
        stock: StockApiClient,
        timers: TimerClient,
        images: ImageClient,
    ) -> Self {
        Self {
            session,
            stock,
            timers,
            images,
        }
    }

    pub fn from_config(cfg: &ScraperConfig, driver: Arc<dyn BrowserDriver>) -> Result<Self, Error> {
        let session = Arc::new(SessionManager::from_config(driver, &cfg.session));
        let stock = StockApiClient::new(&cfg.sources, &cfg.session.page_url)?;
        let timers = TimerClient::new(&cfg.sources)?;
        let images = ImageClient::new(&cfg.sources)?;
        Ok(Self::new(session, stock, timers, images))
    }
}

#[async_trait]
impl StockSource for FetchPipeline {
    async fn fetch_snapshot(&self) -> Result<NormalizedSnapshot, Error> {
        self.session.ensure_fresh().await?;

        info!("Fetching from APIs...");
        let (stock, timers, images) = tokio::join!(
            self.stock.fetch(&self.session),
            self.timers.fetch(),
            self.images.fetch(),
        );

        assemble(stock, timers, images)
    }
}

/// Join point: the stock result decides the cycle, enrichment only shapes it.
pub fn assemble(
    stock: Result<RawStockResponse, Error>,
    timers: Option<TimerSet>,
    images: ImageIndex,
) -> Result<NormalizedSnapshot, Error> {
    let raw = stock?;
    let snapshot = normalize(&raw, timers, &images)?;
    log_summary(&snapshot, timers.is_some());
    Ok(snapshot)
}

fn log_summary(snap: &NormalizedSnapshot, upstream_timers: bool) {
    info!(
        "Items: Seeds={}, Gear={}, Eggs={}, Cosmetics={}, Event={}, Merchant={}",
        snap.seeds_stock.len(),
        snap.gear_stock.len(),
        snap.egg_stock.len(),
        snap.cosmetics_stock.len(),
        snap.event_stock.len(),
        snap.merchants_stock.len()
    );
    info!("Images: {} fetched", snap.image_data.len());
    info!(
        "Weather: {}, Timers ({}): seeds={}m, eggs={}m, cosmetics={}h",
        snap.weather
            .as_ref()
            .and_then(|w| w.kind.as_deref())
            .unwrap_or("unknown"),
        if upstream_timers { "upstream" } else { "defaults" },
        snap.restock_timers.seeds / 60_000,
        snap.restock_timers.eggs / 60_000,
        snap.restock_timers.cosmetics / 3_600_000
    );
}
