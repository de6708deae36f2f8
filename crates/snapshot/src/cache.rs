//! Single-slot snapshot cache with single-flight refresh.
//!
//! Readers always get the last good snapshot, however old, and never wait
//! on a running cycle. A cycle that fails or yields zero items leaves the
//! previous snapshot in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{Error, NormalizedSnapshot};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::pipeline::StockSource;

/// What a call to [`RefreshCache::run_cycle`] did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A new snapshot was stored.
    Updated { items: usize },
    /// The source succeeded with zero items; cache unchanged.
    Empty,
    /// The source failed; cache unchanged.
    Failed(Error),
    /// Another cycle was running; nothing happened.
    Skipped,
}

/// The cached snapshot as seen by a reader at a point in time.
#[derive(Debug, Clone)]
pub struct CachedView {
    pub snapshot: Arc<NormalizedSnapshot>,
    pub last_scraped_at: DateTime<Utc>,
    pub age: chrono::Duration,
    pub stale: bool,
}

impl CachedView {
    /// Age rounded to the nearest whole second.
    pub fn age_seconds(&self) -> i64 {
        (self.age.num_milliseconds() as f64 / 1000.0).round() as i64
    }
}

/// Counters and flags for health reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub success_count: u64,
    pub error_count: u64,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub has_data: bool,
    pub refresh_in_flight: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<NormalizedSnapshot>>,
    last_scraped_at: Option<DateTime<Utc>>,
    success_count: u64,
    error_count: u64,
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the latest snapshot. All mutation goes through [`Self::run_cycle`].
pub struct RefreshCache {
    source: Arc<dyn StockSource>,
    stale_threshold: Duration,
    in_flight: AtomicBool,
    state: RwLock<CacheState>,
}

impl std::fmt::Debug for RefreshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCache")
            .field("stale_threshold", &self.stale_threshold)
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RefreshCache {
    pub fn new(source: Arc<dyn StockSource>, stale_threshold: Duration) -> Self {
        Self {
            source,
            stale_threshold,
            in_flight: AtomicBool::new(false),
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Run one fetch cycle unless one is already running.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            info!("Refresh already in progress, skipping.");
            return CycleOutcome::Skipped;
        };

        info!("Starting refresh cycle...");
        match self.source.fetch_snapshot().await {
            Ok(snapshot) => {
                let items = snapshot.total_items();
                let mut state = self.state.write().await;
                if items > 0 {
                    state.snapshot = Some(Arc::new(snapshot));
                    state.last_scraped_at = Some(Utc::now());
                    state.success_count += 1;
                    info!("Refresh successful: {} total items cached.", items);
                    CycleOutcome::Updated { items }
                } else {
                    state.error_count += 1;
                    warn!("Refresh returned 0 items. Cache unchanged.");
                    CycleOutcome::Empty
                }
            }
            Err(e) => {
                self.state.write().await.error_count += 1;
                error!("Refresh failed: {}", e);
                CycleOutcome::Failed(e)
            }
        }
    }

    /// The cached snapshot with its age as of now.
    pub async fn view(&self) -> Option<CachedView> {
        self.view_at(Utc::now()).await
    }

    /// The cached snapshot with its age as of `now`.
    pub async fn view_at(&self, now: DateTime<Utc>) -> Option<CachedView> {
        let state = self.state.read().await;
        let snapshot = state.snapshot.clone()?;
        let last_scraped_at = state.last_scraped_at?;
        // A wall clock stepped backwards reads as zero age.
        let age = (now - last_scraped_at).max(chrono::Duration::zero());
        let stale = age.to_std().map_or(false, |a| a > self.stale_threshold);
        Some(CachedView {
            snapshot,
            last_scraped_at,
            age,
            stale,
        })
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            success_count: state.success_count,
            error_count: state.error_count,
            last_scraped_at: state.last_scraped_at,
            has_data: state.snapshot.is_some(),
            refresh_in_flight: self.in_flight.load(Ordering::Acquire),
        }
    }

    /// The latest snapshot, if any.
    pub async fn snapshot(&self) -> Option<Arc<NormalizedSnapshot>> {
        self.state.read().await.snapshot.clone()
    }

    /// Drive `run_cycle` on a fixed interval, starting immediately. Each
    /// tick starts its cycle in its own task, so a tick that lands while a
    /// cycle is still running becomes a skip rather than queueing.
    pub fn spawn_refresh_loop(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let cycle_cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cycle_cache.run_cycle().await;
                });
            }
        })
    }
}
